//! One user's pass through the dashboard: dates, trigger, filter, export.

use crate::app::export::{CsvBlob, CsvExporter};
use crate::app::filter::{self, ZipCodeSet, ZipSelection};
use crate::app::listings::{DateRange, ListingsAssembler, ZIP_COLUMN};
use crate::domain::{FlowMachine, FlowState};
use crate::error::AppError;
use crate::query::Dataset;
use std::sync::Arc;

pub struct DashboardSession {
    state: FlowState,
    range: Option<DateRange>,
    data: Option<Arc<Dataset>>,
    zip_domain: ZipCodeSet,
    filtered: Option<Dataset>,
}

impl DashboardSession {
    pub fn new() -> Self {
        Self {
            state: FlowState::AwaitingDateInput,
            range: None,
            data: None,
            zip_domain: ZipCodeSet::default(),
            filtered: None,
        }
    }

    pub fn state(&self) -> FlowState {
        self.state
    }

    fn transition(&mut self, to: FlowState) -> Result<(), AppError> {
        if !FlowMachine::can_transition(self.state, to) {
            return Err(AppError::InvalidTransition(format!(
                "{} -> {}",
                self.state.as_str(),
                to.as_str()
            )));
        }
        log::debug!("Flow {} -> {}", self.state.as_str(), to.as_str());
        self.state = to;
        Ok(())
    }

    /// Record a new range. Previously loaded data is dropped; nothing is queried.
    pub fn set_dates(&mut self, range: DateRange) -> Result<(), AppError> {
        self.transition(FlowState::AwaitingQueryTrigger)?;
        self.range = Some(range);
        self.data = None;
        self.filtered = None;
        self.zip_domain = ZipCodeSet::default();
        Ok(())
    }

    /// The explicit "load" action.
    pub fn trigger_query(&mut self, assembler: &mut ListingsAssembler) -> Result<Arc<Dataset>, AppError> {
        let range = self
            .range
            .ok_or_else(|| AppError::InvalidTransition("no date range selected".into()))?;
        if !FlowMachine::can_transition(self.state, FlowState::DataLoaded) {
            return Err(AppError::InvalidTransition(format!(
                "{} -> {}",
                self.state.as_str(),
                FlowState::DataLoaded.as_str()
            )));
        }
        let data = assembler.get_listings(range.start, range.end)?;
        self.zip_domain = ZipCodeSet::from_dataset(&data, ZIP_COLUMN)?;
        self.data = Some(Arc::clone(&data));
        self.filtered = None;
        self.transition(FlowState::DataLoaded)?;
        Ok(data)
    }

    /// Zip codes offered by the multi-select for the loaded data.
    pub fn zip_options(&self) -> &ZipCodeSet {
        &self.zip_domain
    }

    pub fn data(&self) -> Option<&Dataset> {
        self.data.as_deref()
    }

    pub fn apply_filter(&mut self, selection: &ZipSelection) -> Result<&Dataset, AppError> {
        if !FlowMachine::can_transition(self.state, FlowState::FilterApplied) {
            return Err(AppError::InvalidTransition(format!(
                "{} -> {}",
                self.state.as_str(),
                FlowState::FilterApplied.as_str()
            )));
        }
        let data = self
            .data
            .as_ref()
            .ok_or_else(|| AppError::InvalidTransition("no data loaded".into()))?;
        let chosen = selection.resolve(&self.zip_domain);
        let filtered = filter::apply_filter(data, ZIP_COLUMN, &chosen)?;
        self.transition(FlowState::FilterApplied)?;
        Ok(self.filtered.insert(filtered))
    }

    pub fn filtered(&self) -> Option<&Dataset> {
        self.filtered.as_ref()
    }

    pub fn export_csv(&self, exporter: &mut CsvExporter) -> Result<Arc<CsvBlob>, AppError> {
        let filtered = self
            .filtered
            .as_ref()
            .ok_or_else(|| AppError::InvalidTransition("no filter applied".into()))?;
        exporter.to_csv(filtered)
    }
}

impl Default for DashboardSession {
    fn default() -> Self {
        Self::new()
    }
}
