use std::collections::BTreeMap;
use std::time::Instant;

use super::browser::{GridView, ModelBrowser, ModelEntry, SearchRequest};
use super::documents::{DocumentAction, DocumentState, ManagedDocuments};
use super::{DocumentId, EditorResult};

/// What a panel interaction asks the editing mode to do.
#[derive(Clone, Debug, PartialEq)]
pub enum PanelAction {
    EditExisting,
    /// Preview the model at this GLB URL.
    CreateDocument(String),
    SelectDocument(DocumentId),
    RemoveDocument(DocumentId),
}

impl From<DocumentAction> for PanelAction {
    fn from(action: DocumentAction) -> Self {
        match action {
            DocumentAction::Select(id) => PanelAction::SelectDocument(id),
            DocumentAction::Remove(id) => PanelAction::RemoveDocument(id),
        }
    }
}

/// Model grid, search box, continuous-placement toggle and document list.
pub struct ControlsPanel {
    browser: ModelBrowser,
    documents: ManagedDocuments,
    continuous: bool,
}

impl ControlsPanel {
    pub fn new(models: Vec<ModelEntry>, documents: BTreeMap<DocumentId, DocumentState>) -> Self {
        Self {
            browser: ModelBrowser::new(models),
            documents: ManagedDocuments::new(documents),
            continuous: false,
        }
    }

    pub fn browser(&self) -> &ModelBrowser {
        &self.browser
    }

    pub fn documents(&self) -> &ManagedDocuments {
        &self.documents
    }

    pub fn documents_mut(&mut self) -> &mut ManagedDocuments {
        &mut self.documents
    }

    pub fn grid(&self) -> &GridView {
        self.browser.view()
    }

    pub fn is_continuous(&self) -> bool {
        self.continuous
    }

    pub fn set_continuous(&mut self, continuous: bool) {
        self.continuous = continuous;
    }

    pub fn edit_existing(&self) -> PanelAction {
        PanelAction::EditExisting
    }

    pub fn search_input(&mut self, query: impl Into<String>, now: Instant) {
        self.browser.input(query, now);
    }

    pub fn poll_search(&mut self, now: Instant) -> Option<SearchRequest> {
        self.browser.poll(now)
    }

    pub fn apply_search(&mut self, generation: u64, result: EditorResult<Vec<ModelEntry>>) -> bool {
        self.browser.apply_results(generation, result)
    }

    pub fn click_model(&self, index: usize) -> Option<PanelAction> {
        self.browser
            .model_at(index)
            .map(|model| PanelAction::CreateDocument(model.url.clone()))
    }

    pub fn select_document(&mut self, id: &DocumentId) -> Option<PanelAction> {
        self.documents.select(id).map(PanelAction::from)
    }

    pub fn remove_document(&self, id: &DocumentId) -> Option<PanelAction> {
        self.documents.remove(id).map(PanelAction::from)
    }

    pub fn dispose(&mut self) {
        self.browser.cancel();
        self.documents.hide();
    }
}
