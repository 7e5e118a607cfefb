use smallvec::SmallVec;

/// Built-in bone tags, parsed from underscore-separated prefixes of the
/// authored bone name (e.g. `p_saddle` is a seat named `saddle`).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BoneTag {
    /// Follows the source entity's head rotation.
    Head,
    /// Follows head rotation, including children.
    HeadWithChildren,
    /// Spawns a hitbox following this bone.
    Hitbox,
    /// Usable as a controllable seat.
    Seat,
    /// Usable as a passive (non-controllable) seat.
    SubSeat,
    /// Anchors the model's nametag.
    Nametag,
    /// Displays the source entity's off-hand item.
    LeftItem,
    /// Displays the source entity's main-hand item.
    RightItem,
}

impl BoneTag {
    const ALL: [BoneTag; 8] = [
        BoneTag::Head,
        BoneTag::HeadWithChildren,
        BoneTag::Hitbox,
        BoneTag::Seat,
        BoneTag::SubSeat,
        BoneTag::Nametag,
        BoneTag::LeftItem,
        BoneTag::RightItem,
    ];

    /// The name prefixes that map to this tag.
    #[must_use]
    pub fn codes(self) -> &'static [&'static str] {
        match self {
            BoneTag::Head => &["h"],
            BoneTag::HeadWithChildren => &["hi"],
            BoneTag::Hitbox => &["b", "ob"],
            BoneTag::Seat => &["p"],
            BoneTag::SubSeat => &["sp"],
            BoneTag::Nametag => &["tag"],
            BoneTag::LeftItem => &["li", "pli"],
            BoneTag::RightItem => &["ri", "pri"],
        }
    }

    fn parse(code: &str) -> Option<Self> {
        Self::ALL
            .into_iter()
            .find(|tag| tag.codes().contains(&code))
    }
}

/// A tagged bone name.
///
/// Equality and hashing use the raw authored name, so two bones with the same
/// raw name are the same bone regardless of how the tags parsed.
#[derive(Debug, Clone)]
pub struct BoneName {
    /// Tags parsed from the name's prefixes.
    pub tags: SmallVec<[BoneTag; 2]>,
    /// Name with tag prefixes stripped.
    pub name: String,
    /// Original authored name.
    pub raw: String,
}

impl BoneName {
    /// Parses a raw authored name into tags and a stripped name.
    ///
    /// Leading underscore-separated segments that match tag codes become
    /// tags; parsing stops at the first non-tag segment.
    #[must_use]
    pub fn parse(raw: &str) -> Self {
        let mut tags = SmallVec::new();
        let mut rest = raw;
        while let Some((head, tail)) = rest.split_once('_') {
            match BoneTag::parse(head) {
                Some(tag) => {
                    tags.push(tag);
                    rest = tail;
                }
                None => break,
            }
        }
        Self {
            tags,
            name: rest.to_string(),
            raw: raw.to_string(),
        }
    }

    /// Checks whether this name carries any of the given tags.
    #[must_use]
    pub fn tagged(&self, tags: &[BoneTag]) -> bool {
        tags.iter().any(|t| self.tags.contains(t))
    }
}

impl PartialEq for BoneName {
    fn eq(&self, other: &Self) -> bool {
        self.raw == other.raw
    }
}

impl Eq for BoneName {}

impl std::hash::Hash for BoneName {
    fn hash<H: std::hash::Hasher>(&self, state: &mut H) {
        self.raw.hash(state);
    }
}

impl std::fmt::Display for BoneName {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.raw)
    }
}
