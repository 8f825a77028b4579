//! Installed font lookup

use super::outline::OutlineFont;
use fontdb::{Database, Family, Query, Style, Weight, ID};

/// Where installed fonts come from
///
/// The renderer only needs three questions answered, which keeps font
/// resolution testable without the host's font directories.
pub trait FontSource {
    /// Families of installed faces that can render Chinese text
    fn chinese_families(&self) -> Vec<String>;

    /// Load a family by name, preferring its regular face
    fn load_family(&self, family: &str) -> Option<OutlineFont>;

    /// Load the generic sans-serif face
    fn load_fallback(&self) -> Option<OutlineFont>;
}

/// Character used to probe for Chinese coverage (中)
const CHINESE_PROBE: char = '\u{4E2D}';

/// Installed fonts, as found by fontdb
pub struct FontDiscovery {
    db: Database,
}

impl FontDiscovery {
    /// Scan the system font directories
    pub fn system() -> Self {
        let mut db = Database::new();
        db.load_system_fonts();
        tracing::debug!("Font discovery found {} faces", db.len());
        Self { db }
    }

    /// Use an already populated database
    pub fn from_database(db: Database) -> Self {
        Self { db }
    }

    pub fn len(&self) -> usize {
        self.db.len()
    }

    pub fn is_empty(&self) -> bool {
        self.db.len() == 0
    }

    fn face_supports(&self, id: ID, c: char) -> bool {
        self.db
            .with_face_data(id, |data, index| {
                ttf_parser::Face::parse(data, index)
                    .map(|face| face.glyph_index(c).is_some())
                    .unwrap_or(false)
            })
            .unwrap_or(false)
    }

    fn find_face(&self, family: &str) -> Option<ID> {
        let matching: Vec<_> = self
            .db
            .faces()
            .filter(|face| {
                face.families
                    .iter()
                    .any(|(name, _)| name.eq_ignore_ascii_case(family))
            })
            .collect();

        matching
            .iter()
            .find(|face| face.weight == Weight::NORMAL && face.style == Style::Normal)
            .or_else(|| matching.first())
            .map(|face| face.id)
    }

    fn load_face(&self, id: ID) -> Option<OutlineFont> {
        let family = self
            .db
            .face(id)?
            .families
            .first()
            .map(|(name, _)| name.clone())
            .unwrap_or_default();

        let (data, index) = self
            .db
            .with_face_data(id, |data, index| (data.to_vec(), index))?;

        match OutlineFont::from_bytes(family, data, index) {
            Ok(font) => Some(font),
            Err(e) => {
                tracing::warn!("Skipping unreadable font face: {}", e);
                None
            }
        }
    }
}

impl FontSource for FontDiscovery {
    fn chinese_families(&self) -> Vec<String> {
        let mut families: Vec<String> = self
            .db
            .faces()
            .filter(|face| self.face_supports(face.id, CHINESE_PROBE))
            .filter_map(|face| face.families.first().map(|(name, _)| name.clone()))
            .collect();

        families.sort();
        families.dedup();
        families
    }

    fn load_family(&self, family: &str) -> Option<OutlineFont> {
        self.find_face(family).and_then(|id| self.load_face(id))
    }

    fn load_fallback(&self) -> Option<OutlineFont> {
        let query = Query {
            families: &[Family::SansSerif],
            ..Query::default()
        };
        self.db.query(&query).and_then(|id| self.load_face(id))
    }
}

/// A font source with nothing installed
#[derive(Debug, Default, Clone, Copy)]
pub struct NoFonts;

impl FontSource for NoFonts {
    fn chinese_families(&self) -> Vec<String> {
        Vec::new()
    }

    fn load_family(&self, _family: &str) -> Option<OutlineFont> {
        None
    }

    fn load_fallback(&self) -> Option<OutlineFont> {
        None
    }
}
