use std::sync::{Arc, PoisonError, RwLock};

use crate::error::BoxError;
use crate::formatter::lookup_optional_string_property;
use crate::report::ErrorReport;

/// Resolved custom grouping key handed to grouping observers.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MessageGroup {
    pub group_key: String,
}

impl MessageGroup {
    pub fn new(group_key: impl Into<String>) -> Self {
        MessageGroup {
            group_key: group_key.into(),
        }
    }
}

/// Override context for a report whose grouping is being resolved.
#[derive(Debug)]
pub struct GroupingContext<'a> {
    pub report: &'a ErrorReport,
    pub custom_grouping_key: Option<String>,
}

/// Hook the client consults before sending to override default grouping.
///
/// `Ok(None)` leaves grouping to the service. An error aborts the send.
pub trait GroupingResolver: Send + Sync {
    fn resolve(&self, report: &ErrorReport) -> Result<Option<String>, BoxError>;
}

impl<F> GroupingResolver for F
where
    F: Fn(&ErrorReport) -> Result<Option<String>, BoxError> + Send + Sync,
{
    fn resolve(&self, report: &ErrorReport) -> Result<Option<String>, BoxError> {
        self(report)
    }
}

/// Callback fired whenever a custom grouping key is resolved.
pub type GroupingObserver = Arc<dyn Fn(&GroupingContext<'_>, &MessageGroup) -> Result<(), BoxError> + Send + Sync>;

/// Resolves the custom grouping key from a report's custom data.
///
/// The key is read from the custom-data entry named by
/// `group_key_property`. Observers run synchronously on the send path, in
/// registration order, and the first failing observer aborts delivery.
pub struct GroupingCoordinator {
    group_key_property: String,
    observers: RwLock<Vec<GroupingObserver>>,
}

impl GroupingCoordinator {
    pub fn new(group_key_property: impl Into<String>) -> Self {
        GroupingCoordinator {
            group_key_property: group_key_property.into(),
            observers: RwLock::new(Vec::new()),
        }
    }

    /// Register an observer for resolved grouping keys.
    pub fn subscribe<F>(&self, observer: F)
    where
        F: Fn(&GroupingContext<'_>, &MessageGroup) -> Result<(), BoxError> + Send + Sync + 'static,
    {
        self.observers
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .push(Arc::new(observer));
    }
}

impl GroupingResolver for GroupingCoordinator {
    fn resolve(&self, report: &ErrorReport) -> Result<Option<String>, BoxError> {
        let Some(key) = lookup_optional_string_property(&report.details.user_custom_data, &self.group_key_property)
        else {
            return Ok(None);
        };

        let context = GroupingContext {
            report,
            custom_grouping_key: Some(key.clone()),
        };
        let group = MessageGroup::new(key.clone());

        // Snapshot so observers may subscribe without deadlocking.
        let observers = self
            .observers
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone();
        for observer in &observers {
            observer(&context, &group)?;
        }

        Ok(Some(key))
    }
}
