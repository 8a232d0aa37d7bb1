use std::collections::BTreeMap;

use super::DocumentId;

pub const EMPTY_MESSAGE: &str = "No existing documents found";

/// Snapshot of one placed document, as tracked by the host.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct DocumentState {
    /// Source URL, when the host knows it.
    pub url: Option<String>,
}

impl DocumentState {
    pub fn label(&self) -> &str {
        self.url.as_deref().unwrap_or("Unknown")
    }
}

#[derive(Clone, Debug, PartialEq)]
pub struct DocumentRow {
    pub id: DocumentId,
    pub label: String,
}

#[derive(Clone, Debug, PartialEq)]
pub enum DocumentAction {
    Select(DocumentId),
    Remove(DocumentId),
}

/// The "manage documents" modal.
#[derive(Default)]
pub struct ManagedDocuments {
    states: BTreeMap<DocumentId, DocumentState>,
    ghost: Option<DocumentId>,
    rows: Vec<DocumentRow>,
    open: bool,
}

impl ManagedDocuments {
    pub fn new(states: BTreeMap<DocumentId, DocumentState>) -> Self {
        let mut documents = Self {
            states,
            ..Default::default()
        };
        documents.refresh();
        documents
    }

    /// Re-renders the rows. Hosts call this whenever the document container
    /// changes outside the panel.
    pub fn refresh(&mut self) {
        self.rows = self
            .states
            .iter()
            .filter(|(id, _)| self.ghost.as_ref() != Some(*id))
            .map(|(id, state)| DocumentRow {
                id: id.clone(),
                label: state.label().to_string(),
            })
            .collect();
    }

    pub fn update_states(&mut self, states: BTreeMap<DocumentId, DocumentState>) {
        self.states = states;
        self.refresh();
    }

    /// Hides the document currently shown as the ghost.
    pub fn update_ghost(&mut self, ghost: Option<DocumentId>) {
        if self.ghost != ghost {
            self.ghost = ghost;
            self.refresh();
        }
    }

    pub fn state(&self, id: &DocumentId) -> Option<&DocumentState> {
        self.states.get(id)
    }

    pub fn rows(&self) -> &[DocumentRow] {
        &self.rows
    }

    /// Text shown in place of the rows, if there are none.
    pub fn empty_message(&self) -> Option<&'static str> {
        self.rows.is_empty().then_some(EMPTY_MESSAGE)
    }

    pub fn is_open(&self) -> bool {
        self.open
    }

    pub fn show(&mut self) {
        self.refresh();
        self.open = true;
    }

    pub fn hide(&mut self) {
        self.open = false;
    }

    /// Picking a row hands the document to the edit flow and closes the modal.
    pub fn select(&mut self, id: &DocumentId) -> Option<DocumentAction> {
        let row = self.rows.iter().find(|r| &r.id == id)?;
        let action = DocumentAction::Select(row.id.clone());
        self.hide();
        Some(action)
    }

    pub fn remove(&self, id: &DocumentId) -> Option<DocumentAction> {
        self.rows
            .iter()
            .find(|r| &r.id == id)
            .map(|r| DocumentAction::Remove(r.id.clone()))
    }
}
