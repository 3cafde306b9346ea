//! Modal editor wrapping a [`ModelForm`]
//!
//! The dialog owns visibility and the edited subject, mounts a fresh form on
//! open and relays the form's results to the caller's callbacks. It renders
//! from [`ModelFormDialog::state`]; an edit dialog opened without a subject is
//! visible but has nothing to render.

use std::fmt;

use crate::catalog::{CatalogRequest, CatalogResponse};
use crate::error::{KaasError, Result};
use crate::form::{Field, FormMode, ModelForm};
use crate::schema::{FieldErrors, Submission};
use crate::{ModelConfig, NewModelConfig};

type OnSubmit = Box<dyn FnMut(Submission)>;
type OnDelete = Box<dyn FnMut(&ModelConfig)>;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum DialogKind {
    New,
    Edit,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DialogState {
    Closed,
    /// Visible, but an edit dialog without a subject renders nothing.
    AwaitingSubject,
    Open,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SubmitOutcome {
    /// Value handed to `on_submit`; the dialog is now closed.
    Submitted,
    Invalid(FieldErrors),
    NotOpen,
}

enum Surface {
    Closed,
    AwaitingSubject,
    Open(ModelForm),
}

pub struct ModelFormDialog {
    kind: DialogKind,
    surface: Surface,
    on_submit: OnSubmit,
    on_delete: Option<OnDelete>,
}

impl ModelFormDialog {
    /// Dialog creating a new model configuration
    pub fn new_model(mut on_submit: impl FnMut(NewModelConfig) + 'static) -> Self {
        Self {
            kind: DialogKind::New,
            surface: Surface::Closed,
            on_submit: Box::new(move |submission| {
                if let Submission::New(model) = submission {
                    on_submit(model);
                }
            }),
            on_delete: None,
        }
    }

    /// Dialog editing an existing model configuration
    pub fn edit_model(
        mut on_submit: impl FnMut(ModelConfig) + 'static,
        on_delete: impl FnMut(&ModelConfig) + 'static,
    ) -> Self {
        Self {
            kind: DialogKind::Edit,
            surface: Surface::Closed,
            on_submit: Box::new(move |submission| {
                if let Submission::Edit(model) = submission {
                    on_submit(model);
                }
            }),
            on_delete: Some(Box::new(on_delete)),
        }
    }

    pub fn state(&self) -> DialogState {
        match self.surface {
            Surface::Closed => DialogState::Closed,
            Surface::AwaitingSubject => DialogState::AwaitingSubject,
            Surface::Open(_) => DialogState::Open,
        }
    }

    pub fn is_visible(&self) -> bool {
        !matches!(self.surface, Surface::Closed)
    }

    pub fn is_rendered(&self) -> bool {
        matches!(self.surface, Surface::Open(_))
    }

    pub fn form(&self) -> Option<&ModelForm> {
        match &self.surface {
            Surface::Open(form) => Some(form),
            _ => None,
        }
    }

    /// The model being edited, if any
    pub fn subject(&self) -> Option<&ModelConfig> {
        match self.form()?.mode() {
            FormMode::Edit(model) => Some(model),
            FormMode::New => None,
        }
    }

    /// Show the dialog. New dialogs ignore `initial`; edit dialogs mount a
    /// form for it, or render nothing when it is `None`.
    pub fn open(&mut self, initial: Option<ModelConfig>) -> Option<CatalogRequest> {
        let mode = match (self.kind, initial) {
            (DialogKind::New, _) if self.is_rendered() => return None,
            (DialogKind::New, _) => FormMode::New,
            (DialogKind::Edit, Some(model)) => FormMode::Edit(model),
            (DialogKind::Edit, None) => {
                tracing::debug!("Edit dialog opened without a model");
                self.surface = Surface::AwaitingSubject;
                return None;
            }
        };

        let mut form = ModelForm::new(mode);
        let request = form.mount();
        self.surface = Surface::Open(form);
        request
    }

    /// Hide the dialog and drop the form together with the edited subject.
    pub fn close(&mut self) {
        self.surface = Surface::Closed;
    }

    pub fn set_field(
        &mut self,
        field: Field,
        value: impl Into<String>,
    ) -> Result<Option<CatalogRequest>> {
        self.form_mut()?.set_field(field, value)
    }

    pub fn select_model(&mut self, model: impl Into<String>) -> Result<()> {
        self.form_mut()?.select_model(model);
        Ok(())
    }

    pub fn reset(&mut self) {
        if let Surface::Open(form) = &mut self.surface {
            form.reset();
        }
    }

    /// Feed a catalog result to the mounted form. Results arriving after
    /// close are dropped.
    pub fn apply_catalog(&mut self, response: CatalogResponse) -> bool {
        match &mut self.surface {
            Surface::Open(form) => form.apply_catalog(response),
            _ => false,
        }
    }

    pub fn submit(&mut self) -> SubmitOutcome {
        let Surface::Open(form) = &mut self.surface else {
            return SubmitOutcome::NotOpen;
        };
        let submission = match form.submit() {
            Ok(submission) => submission,
            Err(errors) => return SubmitOutcome::Invalid(errors.clone()),
        };

        (self.on_submit)(submission);
        self.close();
        SubmitOutcome::Submitted
    }

    /// Hand the edited subject to `on_delete`. The dialog stays open; the
    /// caller decides whether to close it.
    pub fn delete(&mut self) -> bool {
        let (Surface::Open(form), Some(on_delete)) = (&self.surface, &mut self.on_delete) else {
            return false;
        };
        let FormMode::Edit(model) = form.mode() else {
            return false;
        };
        on_delete(model);
        true
    }

    fn form_mut(&mut self) -> Result<&mut ModelForm> {
        match &mut self.surface {
            Surface::Open(form) => Ok(form),
            _ => Err(KaasError::DialogClosed),
        }
    }
}

impl fmt::Debug for ModelFormDialog {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ModelFormDialog")
            .field("kind", &self.kind)
            .field("state", &self.state())
            .field("form", &self.form())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use std::cell::RefCell;
    use std::rc::Rc;

    use super::*;
    use crate::form::FormValues;
    use crate::Provider;

    fn existing() -> ModelConfig {
        ModelConfig {
            id: "42".to_string(),
            provider: Provider::Ollama,
            alias: "X".to_string(),
            endpoint: "e".to_string(),
            model: "m".to_string(),
        }
    }

    fn recording<T: Clone + 'static>() -> (Rc<RefCell<Vec<T>>>, impl FnMut(T)) {
        let calls = Rc::new(RefCell::new(Vec::new()));
        let sink = calls.clone();
        (calls, move |value: T| sink.borrow_mut().push(value))
    }

    fn edit_dialog() -> (
        ModelFormDialog,
        Rc<RefCell<Vec<ModelConfig>>>,
        Rc<RefCell<Vec<ModelConfig>>>,
    ) {
        let (submitted, on_submit) = recording::<ModelConfig>();
        let (deleted, mut on_delete) = recording::<ModelConfig>();
        let dialog = ModelFormDialog::edit_model(on_submit, move |m: &ModelConfig| {
            on_delete(m.clone())
        });
        (dialog, submitted, deleted)
    }

    #[test]
    fn test_new_dialog_submit_scenario() {
        let (submitted, on_submit) = recording::<NewModelConfig>();
        let mut dialog = ModelFormDialog::new_model(on_submit);
        assert_eq!(dialog.state(), DialogState::Closed);

        assert!(dialog.open(None).is_none());
        assert!(dialog.is_rendered());
        dialog.set_field(Field::Alias, "Local").unwrap();
        dialog
            .set_field(Field::Endpoint, "http://localhost:11434")
            .unwrap();
        dialog.select_model("llama3").unwrap();

        assert_eq!(dialog.submit(), SubmitOutcome::Submitted);
        assert_eq!(
            *submitted.borrow(),
            vec![NewModelConfig {
                provider: Provider::Ollama,
                alias: "Local".to_string(),
                endpoint: "http://localhost:11434".to_string(),
                model: "llama3".to_string(),
            }]
        );
        assert_eq!(dialog.state(), DialogState::Closed);
        assert_eq!(dialog.submit(), SubmitOutcome::NotOpen);
        assert_eq!(submitted.borrow().len(), 1);
    }

    #[test]
    fn test_invalid_submit_keeps_dialog_open() {
        let (submitted, on_submit) = recording::<NewModelConfig>();
        let mut dialog = ModelFormDialog::new_model(on_submit);
        dialog.open(None);
        dialog.set_field(Field::Endpoint, "http://localhost:11434").unwrap();

        let SubmitOutcome::Invalid(errors) = dialog.submit() else {
            panic!("expected validation failure");
        };
        assert!(!errors.is_empty());
        assert!(errors.get(Field::Alias).is_some());
        assert!(submitted.borrow().is_empty());
        assert_eq!(dialog.state(), DialogState::Open);
        assert!(dialog.form().unwrap().error(Field::Alias).is_some());
    }

    #[test]
    fn test_new_dialog_reopens_fresh_after_close() {
        let (_, on_submit) = recording::<NewModelConfig>();
        let mut dialog = ModelFormDialog::new_model(on_submit);
        dialog.open(None);
        dialog.set_field(Field::Alias, "draft").unwrap();

        // Re-opening while open keeps the draft
        dialog.open(Some(existing()));
        assert_eq!(dialog.form().unwrap().value(Field::Alias), "draft");
        assert!(dialog.subject().is_none());

        dialog.close();
        dialog.open(None);
        assert_eq!(dialog.form().unwrap().value(Field::Alias), "");
    }

    #[test]
    fn test_edit_open_without_subject_renders_nothing() {
        let (mut dialog, _, _) = edit_dialog();
        assert!(dialog.open(None).is_none());

        assert_eq!(dialog.state(), DialogState::AwaitingSubject);
        assert!(dialog.is_visible());
        assert!(!dialog.is_rendered());
        assert!(dialog.form().is_none());
        assert_eq!(dialog.submit(), SubmitOutcome::NotOpen);
        assert!(matches!(
            dialog.set_field(Field::Alias, "x"),
            Err(KaasError::DialogClosed)
        ));
    }

    #[test]
    fn test_edit_open_prefills_subject() {
        let (mut dialog, _, _) = edit_dialog();
        let request = dialog.open(Some(existing())).unwrap();

        assert_eq!(request.config.endpoint, "e");
        assert_eq!(dialog.subject(), Some(&existing()));
        assert_eq!(dialog.form().unwrap().values(), &FormValues::from(&existing()));
    }

    #[test]
    fn test_delete_keeps_dialog_open() {
        let (mut dialog, submitted, deleted) = edit_dialog();
        dialog.open(Some(existing()));
        dialog.set_field(Field::Alias, "edited").unwrap();

        assert!(dialog.delete());
        assert_eq!(*deleted.borrow(), vec![existing()]);
        assert!(submitted.borrow().is_empty());
        assert_eq!(dialog.state(), DialogState::Open);
        assert_eq!(dialog.subject(), Some(&existing()));
    }

    #[test]
    fn test_edit_submit_relays_and_clears_subject() {
        let (mut dialog, submitted, _) = edit_dialog();
        dialog.open(Some(existing()));
        dialog.set_field(Field::Model, "m2").unwrap();

        assert_eq!(dialog.submit(), SubmitOutcome::Submitted);
        assert_eq!(submitted.borrow()[0].model, "m2");
        assert_eq!(submitted.borrow()[0].id, "42");
        assert!(dialog.subject().is_none());
        assert_eq!(dialog.state(), DialogState::Closed);
    }

    #[test]
    fn test_edit_submits_untouched_subject() {
        let (mut dialog, submitted, _) = edit_dialog();
        dialog.open(Some(existing()));

        assert_eq!(dialog.submit(), SubmitOutcome::Submitted);
        assert_eq!(*submitted.borrow(), vec![existing()]);
    }

    #[test]
    fn test_close_drops_late_catalog() {
        let (mut dialog, _, _) = edit_dialog();
        let request = dialog.open(Some(existing())).unwrap();
        dialog.close();

        assert!(dialog.subject().is_none());
        assert!(!dialog.apply_catalog(CatalogResponse::new(&request, Ok(vec!["m".into()]))));

        // A new session never accepts the old session's result
        dialog.open(Some(existing()));
        assert!(!dialog.apply_catalog(CatalogResponse::new(&request, Ok(vec!["m".into()]))));
    }

    #[test]
    fn test_reopen_with_other_subject_replaces_form() {
        let (mut dialog, _, _) = edit_dialog();
        dialog.open(Some(existing()));
        let other = ModelConfig {
            id: "7".to_string(),
            alias: "Other".to_string(),
            ..existing()
        };
        dialog.open(Some(other.clone()));

        assert_eq!(dialog.subject(), Some(&other));
        assert_eq!(dialog.form().unwrap().value(Field::Alias), "Other");
    }

    #[test]
    fn test_reset_discards_edits_without_submitting() {
        let (mut dialog, submitted, _) = edit_dialog();
        dialog.open(Some(existing()));
        dialog.set_field(Field::Alias, "changed").unwrap();

        dialog.reset();

        assert_eq!(dialog.form().unwrap().value(Field::Alias), "X");
        assert!(submitted.borrow().is_empty());
        assert_eq!(dialog.state(), DialogState::Open);
    }

    #[test]
    fn test_new_dialog_cannot_delete() {
        let (_, on_submit) = recording::<NewModelConfig>();
        let mut dialog = ModelFormDialog::new_model(on_submit);
        dialog.open(None);
        assert!(!dialog.delete());
    }
}
