use uuid::Uuid;

use crate::bone::tree::RenderedBone;

/// Something following a bone: an entity, an item display, a hitbox.
///
/// Attachments are updated once per tick per viewer after world transforms
/// are frozen, and removed when the owning tracker closes.
pub trait BoneAttachment: Send {
    /// Synchronizes the attachment with the bone's current world transform.
    ///
    /// `viewer` is `None` for the authoritative update.
    fn update(&mut self, bone: &RenderedBone, viewer: Option<Uuid>);

    /// Cleans the attachment up; called exactly once before it is dropped.
    fn remove(&mut self) {}
}
