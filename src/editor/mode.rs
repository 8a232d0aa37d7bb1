use std::collections::BTreeMap;

use super::documents::DocumentState;
use super::panel::{ControlsPanel, PanelAction};
use super::placement::{
    CreateTicket, GhostKind, PlacementController, PlacementHandler, PointerOutcome, PointerUpdate,
};
use super::scene::GhostScene;
use super::{DocumentId, EditorError, EditorResult};
use crate::util::encode_component;

/// Wires the controls panel to the placement controller.
pub struct EditingMode<S: GhostScene, H: PlacementHandler> {
    controller: PlacementController<S, H>,
    panel: ControlsPanel,
    object_base: String,
}

impl<S: GhostScene, H: PlacementHandler> EditingMode<S, H> {
    /// `object_base` is the world's server prefix, e.g.
    /// `https://host/world/{world_id}`.
    pub fn new(scene: S, handler: H, panel: ControlsPanel, object_base: impl Into<String>) -> Self {
        Self {
            controller: PlacementController::new(scene, handler),
            panel,
            object_base: object_base.into().trim_end_matches('/').to_string(),
        }
    }

    pub fn controller(&self) -> &PlacementController<S, H> {
        &self.controller
    }

    pub fn controller_mut(&mut self) -> &mut PlacementController<S, H> {
        &mut self.controller
    }

    pub fn panel(&self) -> &ControlsPanel {
        &self.panel
    }

    pub fn panel_mut(&mut self) -> &mut ControlsPanel {
        &mut self.panel
    }

    /// Document URL that wraps a catalog GLB for this world.
    pub fn ghost_url_for(&self, model_url: &str) -> String {
        format!(
            "{}/object/{}/mml",
            self.object_base,
            encode_component(model_url)
        )
    }

    pub fn handle(&mut self, action: PanelAction) -> EditorResult<()> {
        match action {
            PanelAction::EditExisting => {
                self.controller.toggle_edit_mode();
            }
            PanelAction::CreateDocument(model_url) => {
                let url = self.ghost_url_for(&model_url);
                self.controller.set_ghost_url(&url)?;
            }
            PanelAction::SelectDocument(id) => {
                let url = self
                    .panel
                    .documents()
                    .state(&id)
                    .and_then(|s| s.url.clone())
                    .ok_or_else(|| EditorError::UnknownDocument(id.to_string()))?;
                self.controller.select_existing(id, &url)?;
            }
            PanelAction::RemoveDocument(id) => {
                self.controller.handler_mut().on_remove(&id);
            }
        }
        self.sync_ghost();
        Ok(())
    }

    pub fn set_continuous(&mut self, continuous: bool) {
        self.panel.set_continuous(continuous);
        self.controller.set_continuous(continuous);
    }

    pub fn pointer_update(&mut self, update: PointerUpdate) -> PointerOutcome {
        let outcome = self.controller.pointer_update(update);
        self.sync_ghost();
        outcome
    }

    pub fn create_settled(&mut self, ticket: CreateTicket) -> bool {
        let settled = self.controller.create_settled(ticket);
        self.sync_ghost();
        settled
    }

    /// Host hook for changes to the placed-document container.
    pub fn documents_changed(&mut self, states: BTreeMap<DocumentId, DocumentState>) {
        self.panel.documents_mut().update_states(states);
    }

    pub fn dispose(&mut self) {
        self.controller.dispose();
        self.panel.dispose();
    }

    fn sync_ghost(&mut self) {
        let editing = match self.controller.ghost().map(|g| &g.kind) {
            Some(GhostKind::Existing(id)) => Some(id.clone()),
            _ => None,
        };
        self.panel.documents_mut().update_ghost(editing);
    }
}
