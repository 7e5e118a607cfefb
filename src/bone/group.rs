use std::sync::Arc;

use glam::Vec3;
use uuid::Uuid;

use crate::bone::name::{BoneName, BoneTag};

/// Axis-aligned hit-box geometry attached to a bone.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BoundingBox {
    /// Minimum corner, bone-local.
    pub min: Vec3,
    /// Maximum corner, bone-local.
    pub max: Vec3,
}

impl BoundingBox {
    /// Center of the box.
    #[inline]
    #[must_use]
    pub fn center(&self) -> Vec3 {
        (self.min + self.max) * 0.5
    }
}

/// The display item resolved for a bone.
#[derive(Debug, Clone, PartialEq)]
pub struct DisplayItem {
    /// Platform item identifier.
    pub item: String,
    /// Display offset, bone-local.
    pub offset: Vec3,
    /// Display scale.
    pub scale: Vec3,
}

/// How a bone classifies for mounting, derived from its name tags.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MountClass {
    /// A controllable seat.
    Seat,
    /// A passive seat.
    SubSeat,
    /// Not mountable at all.
    NotMountable,
}

/// One bone's static, authoring-time definition.
///
/// Groups form an immutable tree shared by every tracker instantiated from
/// the same model; all runtime state lives in the rendered tree.
#[derive(Debug)]
pub struct BoneGroup {
    /// Parsed bone name.
    pub name: BoneName,
    /// Stable identity across trackers.
    pub uuid: Uuid,
    /// Rest origin in model space.
    pub origin: Vec3,
    /// Rest rotation in euler degrees.
    pub rotation: Vec3,
    /// Display item, if the bone renders one.
    pub item: Option<DisplayItem>,
    /// Hit-box geometry, if tagged.
    pub hitbox: Option<BoundingBox>,
    /// Child groups, keyed by insertion order.
    pub children: Vec<Arc<BoneGroup>>,
}

impl BoneGroup {
    /// Creates a leaf group.
    #[must_use]
    pub fn new(raw_name: &str, origin: Vec3, rotation: Vec3) -> Self {
        Self {
            name: BoneName::parse(raw_name),
            uuid: Uuid::new_v4(),
            origin,
            rotation,
            item: None,
            hitbox: None,
            children: Vec::new(),
        }
    }

    /// Adds a child group.
    #[must_use]
    pub fn with_child(mut self, child: BoneGroup) -> Self {
        self.children.push(Arc::new(child));
        self
    }

    /// Sets the display item.
    #[must_use]
    pub fn with_item(mut self, item: DisplayItem) -> Self {
        self.item = Some(item);
        self
    }

    /// Sets the hit-box geometry.
    #[must_use]
    pub fn with_hitbox(mut self, hitbox: BoundingBox) -> Self {
        self.hitbox = Some(hitbox);
        self
    }

    /// Mount classification from the name tags.
    #[must_use]
    pub fn mount_class(&self) -> MountClass {
        if self.name.tagged(&[BoneTag::Seat]) {
            MountClass::Seat
        } else if self.name.tagged(&[BoneTag::SubSeat]) {
            MountClass::SubSeat
        } else {
            MountClass::NotMountable
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn seat_tags_classify_mounting() {
        assert_eq!(
            BoneGroup::new("p_saddle", Vec3::ZERO, Vec3::ZERO).mount_class(),
            MountClass::Seat
        );
        assert_eq!(
            BoneGroup::new("sp_pillion", Vec3::ZERO, Vec3::ZERO).mount_class(),
            MountClass::SubSeat
        );
        assert_eq!(
            BoneGroup::new("torso", Vec3::ZERO, Vec3::ZERO).mount_class(),
            MountClass::NotMountable
        );
    }

    #[test]
    fn hitbox_center() {
        let group = BoneGroup::new("b_chest", Vec3::ZERO, Vec3::ZERO).with_hitbox(BoundingBox {
            min: Vec3::new(-1.0, 0.0, -1.0),
            max: Vec3::new(1.0, 2.0, 1.0),
        });
        assert_eq!(group.hitbox.unwrap().center(), Vec3::new(0.0, 1.0, 0.0));
    }

    #[test]
    fn display_item_carries_through() {
        let group = BoneGroup::new("ri_blade", Vec3::ZERO, Vec3::ZERO).with_item(DisplayItem {
            item: "iron_sword".to_string(),
            offset: Vec3::ZERO,
            scale: Vec3::ONE,
        });
        assert!(group.name.tagged(&[BoneTag::RightItem]));
        assert_eq!(group.item.unwrap().item, "iron_sword");
    }
}
