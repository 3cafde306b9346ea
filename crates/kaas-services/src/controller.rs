//! Event loop glue between a [`ModelFormDialog`] and a [`CatalogWorker`]

use kaas_core::{
    CatalogRequest, DialogState, Field, ModelConfig, ModelForm, ModelFormDialog, Result,
    SubmitOutcome,
};
use uuid::Uuid;

use crate::CatalogWorker;

/// Drives one dialog: every catalog fetch the dialog asks for is dispatched
/// to the worker, and finished fetches are fed back on [`poll`](Self::poll).
pub struct ModelDialogController {
    dialog: ModelFormDialog,
    worker: CatalogWorker,
}

impl ModelDialogController {
    pub fn new(dialog: ModelFormDialog, worker: CatalogWorker) -> Self {
        Self { dialog, worker }
    }

    pub fn dialog(&self) -> &ModelFormDialog {
        &self.dialog
    }

    pub fn form(&self) -> Option<&ModelForm> {
        self.dialog.form()
    }

    pub fn state(&self) -> DialogState {
        self.dialog.state()
    }

    pub fn open(&mut self, initial: Option<ModelConfig>) {
        let previous = self.current_form();
        let request = self.dialog.open(initial);
        if previous.is_some() && previous != self.current_form() {
            self.cancel(previous);
        }
        self.dispatch(request);
    }

    pub fn close(&mut self) {
        self.cancel(self.current_form());
        self.dialog.close();
    }

    pub fn reset(&mut self) {
        self.cancel(self.current_form());
        self.dialog.reset();
    }

    pub fn set_field(&mut self, field: Field, value: impl Into<String>) -> Result<()> {
        let request = self.dialog.set_field(field, value)?;
        self.dispatch(request);
        Ok(())
    }

    pub fn select_model(&mut self, model: impl Into<String>) -> Result<()> {
        self.dialog.select_model(model)
    }

    pub fn submit(&mut self) -> SubmitOutcome {
        let form = self.current_form();
        let outcome = self.dialog.submit();
        if outcome == SubmitOutcome::Submitted {
            self.cancel(form);
        }
        outcome
    }

    pub fn delete(&mut self) -> bool {
        self.dialog.delete()
    }

    /// Apply every fetch result that is ready. Returns how many were
    /// accepted; stale ones are dropped.
    pub fn poll(&mut self) -> usize {
        let mut applied = 0;
        while let Some(response) = self.worker.try_next() {
            if self.dialog.apply_catalog(response) {
                applied += 1;
            }
        }
        applied
    }

    /// Wait until the mounted form's catalog is no longer loading.
    pub async fn settle(&mut self) {
        while self.is_loading() {
            let Some(response) = self.worker.next().await else {
                return;
            };
            self.dialog.apply_catalog(response);
        }
    }

    fn is_loading(&self) -> bool {
        self.dialog
            .form()
            .is_some_and(|form| form.catalog().is_loading())
    }

    fn current_form(&self) -> Option<Uuid> {
        self.dialog.form().map(|form| form.catalog().ticket().form)
    }

    fn dispatch(&self, request: Option<CatalogRequest>) {
        if let Some(request) = request {
            self.worker.dispatch(request);
        }
    }

    fn cancel(&self, form: Option<Uuid>) {
        if let Some(form) = form {
            self.worker.cancel(form);
        }
    }
}
