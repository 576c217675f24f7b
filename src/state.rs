use crate::store::CheckedDayStore;
use chrono::NaiveDate;

#[derive(Clone)]
pub struct AppState {
    pub store: CheckedDayStore,
    pub epoch: NaiveDate,
}

impl AppState {
    pub fn new(store: CheckedDayStore, epoch: NaiveDate) -> Self {
        Self { store, epoch }
    }
}
