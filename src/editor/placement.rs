//! Ghost placement: one translucent preview that follows the pointer and turns
//! into a create or move request on click.

use super::scene::GhostScene;
use super::{DocumentDescriptor, DocumentId, EditorError, EditorResult, PlacementEvent, Transform};

// ── Callbacks ───────────────────────────────────────────────────────────────

/// Identifies one in-flight create request.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct CreateTicket(u64);

/// Caller-owned side of placement. The controller never learns whether a
/// create or move succeeded; it only waits for [`PlacementController::create_settled`].
pub trait PlacementHandler {
    fn on_move(&mut self, target: &DocumentId, event: PlacementEvent);
    fn on_create(&mut self, request: DocumentDescriptor, ticket: CreateTicket);
    fn on_remove(&mut self, target: &DocumentId);
    fn on_ghost_changed(&mut self, _ghost: Option<&GhostInfo>) {}
}

// ── State ───────────────────────────────────────────────────────────────────

#[derive(Clone, Debug, PartialEq)]
pub enum GhostKind {
    New,
    Existing(DocumentId),
}

#[derive(Clone, Debug, PartialEq)]
pub struct GhostInfo {
    pub source: String,
    pub kind: GhostKind,
}

#[derive(Clone, Debug, PartialEq)]
pub enum PlacementState {
    Idle,
    PreviewingNew,
    PreviewingExisting { target: DocumentId },
    AwaitingCreateResult,
}

/// One raycast result from the host.
#[derive(Clone, Debug, Default)]
pub struct PointerUpdate {
    /// `None` when the pointer hits nothing.
    pub transform: Option<Transform>,
    pub is_click: bool,
    /// Placed document under the pointer, when editing existing documents.
    pub existing_frame: Option<DocumentId>,
}

#[derive(Clone, Debug, PartialEq)]
pub enum PointerOutcome {
    Ignored,
    Moved,
    MoveRequested(DocumentId),
    CreateRequested(CreateTicket),
}

struct Ghost<H> {
    info: GhostInfo,
    handle: H,
}

pub struct PlacementController<S: GhostScene, H: PlacementHandler> {
    scene: S,
    handler: H,
    ghost: Option<Ghost<S::Handle>>,
    ghost_transform: Option<Transform>,
    pending: Option<CreateTicket>,
    next_ticket: u64,
    continuous: bool,
    edit_mode: bool,
    disposed: bool,
}

impl<S: GhostScene, H: PlacementHandler> PlacementController<S, H> {
    pub fn new(scene: S, handler: H) -> Self {
        Self {
            scene,
            handler,
            ghost: None,
            ghost_transform: None,
            pending: None,
            next_ticket: 0,
            continuous: false,
            edit_mode: false,
            disposed: false,
        }
    }

    pub fn state(&self) -> PlacementState {
        if self.pending.is_some() {
            return PlacementState::AwaitingCreateResult;
        }
        match self.ghost.as_ref().map(|g| &g.info.kind) {
            None => PlacementState::Idle,
            Some(GhostKind::New) => PlacementState::PreviewingNew,
            Some(GhostKind::Existing(target)) => PlacementState::PreviewingExisting {
                target: target.clone(),
            },
        }
    }

    pub fn ghost(&self) -> Option<&GhostInfo> {
        self.ghost.as_ref().map(|g| &g.info)
    }

    pub fn ghost_handle(&self) -> Option<&S::Handle> {
        self.ghost.as_ref().map(|g| &g.handle)
    }

    /// Last transform applied to the ghost root.
    pub fn ghost_transform(&self) -> Option<&Transform> {
        self.ghost_transform.as_ref()
    }

    pub fn scene(&self) -> &S {
        &self.scene
    }

    pub fn scene_mut(&mut self) -> &mut S {
        &mut self.scene
    }

    pub fn handler(&self) -> &H {
        &self.handler
    }

    pub fn handler_mut(&mut self) -> &mut H {
        &mut self.handler
    }

    pub fn is_continuous(&self) -> bool {
        self.continuous
    }

    pub fn set_continuous(&mut self, continuous: bool) {
        self.continuous = continuous;
    }

    /// Whether clicks should pick placed documents instead of placing.
    pub fn edit_mode(&self) -> bool {
        self.edit_mode
    }

    pub fn toggle_edit_mode(&mut self) -> bool {
        self.edit_mode = !self.edit_mode;
        self.edit_mode
    }

    fn notify_ghost_changed(&mut self) {
        self.handler
            .on_ghost_changed(self.ghost.as_ref().map(|g| &g.info));
    }

    fn mount(&mut self, source: &str, kind: GhostKind) -> EditorResult<()> {
        if self.disposed {
            return Err(EditorError::Disposed);
        }
        if let Some(ghost) = &mut self.ghost {
            if ghost.info.source == source {
                // Same preview; only an explicit selection retargets it.
                if let GhostKind::Existing(_) = kind {
                    if ghost.info.kind != kind {
                        ghost.info.kind = kind;
                        self.notify_ghost_changed();
                    }
                }
                return Ok(());
            }
        }
        self.clear_ghost();

        let handle = self.scene.mount(source)?;
        tracing::debug!("Mounted ghost for {source}");
        self.ghost = Some(Ghost {
            info: GhostInfo {
                source: source.to_string(),
                kind,
            },
            handle,
        });
        self.notify_ghost_changed();
        Ok(())
    }

    /// Previews a catalog model. Same URL as the live ghost is a no-op, even
    /// when that ghost is bound to a placed document.
    pub fn set_ghost_url(&mut self, url: &str) -> EditorResult<()> {
        self.mount(url, GhostKind::New)
    }

    /// Binds the ghost to a placed document so the next click moves it.
    pub fn select_existing(&mut self, target: DocumentId, url: &str) -> EditorResult<()> {
        self.mount(url, GhostKind::Existing(target))
    }

    pub fn clear_ghost(&mut self) {
        if let Some(ghost) = self.ghost.take() {
            self.scene.unmount(&ghost.handle);
            self.notify_ghost_changed();
        }
    }

    pub fn pointer_update(&mut self, update: PointerUpdate) -> PointerOutcome {
        if self.disposed || self.pending.is_some() {
            return PointerOutcome::Ignored;
        }
        let Some(transform) = update.transform else {
            return PointerOutcome::Ignored;
        };
        self.scene.set_root_transform(&transform);
        self.ghost_transform = Some(transform);

        if !update.is_click {
            return PointerOutcome::Moved;
        }
        let Some(ghost) = &self.ghost else {
            return PointerOutcome::Moved;
        };

        let event = PlacementEvent::from_transform(&transform);
        let target = update.existing_frame.or_else(|| match &ghost.info.kind {
            GhostKind::Existing(id) => Some(id.clone()),
            GhostKind::New => None,
        });

        if let Some(target) = target {
            self.handler.on_move(&target, event);
            self.clear_ghost();
            return PointerOutcome::MoveRequested(target);
        }

        self.next_ticket += 1;
        let ticket = CreateTicket(self.next_ticket);
        let request = DocumentDescriptor {
            url: ghost.info.source.clone(),
            position: event.position,
            rotation: event.rotation,
        };
        self.pending = Some(ticket);
        self.handler.on_create(request, ticket);
        PointerOutcome::CreateRequested(ticket)
    }

    /// Ends the wait started by a create click, whatever its outcome.
    /// Returns `false` for tickets that are no longer pending.
    pub fn create_settled(&mut self, ticket: CreateTicket) -> bool {
        if self.pending != Some(ticket) {
            return false;
        }
        self.pending = None;
        if !self.continuous {
            self.clear_ghost();
        }
        true
    }

    pub fn is_disposed(&self) -> bool {
        self.disposed
    }

    pub fn dispose(&mut self) {
        if self.disposed {
            return;
        }
        self.clear_ghost();
        self.pending = None;
        self.scene.dispose();
        self.disposed = true;
    }
}
