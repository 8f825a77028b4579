//! Font selection for text watermarks
//!
//! Text is drawn either with one of the PDF base fonts (selectable, nothing
//! embedded) or with the outlines of an installed font. Chinese text always
//! takes the second path since no base font has CJK glyphs.

pub mod discovery;
pub mod outline;
pub mod standard;

pub use discovery::{FontDiscovery, FontSource, NoFonts};
pub use outline::OutlineFont;
pub use standard::StandardFont;

use crate::error::WatermarkError;
use crate::options::DrawingOptions;

/// Check whether the text contains any CJK unified ideograph
pub fn is_chinese(text: &str) -> bool {
    text.chars().any(|c| ('\u{4E00}'..='\u{9FFF}').contains(&c))
}

/// Pick the font to render Chinese text with.
///
/// The requested font wins if it is one of the candidates. Otherwise the
/// first family with "Hei" in its name (but not at the start) is used, and
/// failing that the first candidate.
pub fn select_chinese_font(requested: &str, candidates: &[String]) -> Option<String> {
    if candidates.is_empty() {
        return None;
    }
    if candidates.iter().any(|c| c == requested) {
        return Some(requested.to_string());
    }
    candidates
        .iter()
        .find(|c| c.find("Hei").is_some_and(|pos| pos > 0))
        .or_else(|| candidates.first())
        .cloned()
}

/// The font text will actually be drawn with
#[derive(Debug, Clone)]
pub enum ResolvedFont {
    Standard(StandardFont),
    Outline(OutlineFont),
}

impl ResolvedFont {
    pub fn name(&self) -> &str {
        match self {
            ResolvedFont::Standard(font) => font.base_font(),
            ResolvedFont::Outline(font) => font.family(),
        }
    }

    /// Width of `text` in points at `size`
    pub fn string_width(&self, text: &str, size: f64) -> Result<f64, WatermarkError> {
        match self {
            ResolvedFont::Standard(font) => Ok(font.string_width(text, size)),
            ResolvedFont::Outline(font) => font.string_width(text, size),
        }
    }
}

/// Whether drawing this watermark may need an installed font.
///
/// Text in a base font that stays selectable never touches the system font
/// directories, so callers can skip scanning them.
pub fn needs_installed_fonts(drawing: &DrawingOptions) -> bool {
    match drawing.text() {
        Some(text) => {
            is_chinese(text)
                || drawing.unselectable
                || StandardFont::from_name(&drawing.text_font).is_none()
        }
        None => false,
    }
}

/// Decide how the watermark text is drawn
pub fn resolve_font(drawing: &DrawingOptions, fonts: &dyn FontSource) -> ResolvedFont {
    let font = choose_font(drawing, fonts);
    if let Some(warning) = missing_glyph_warning(&font, drawing.text().unwrap_or_default()) {
        tracing::warn!("{}", warning);
    }
    font
}

fn choose_font(drawing: &DrawingOptions, fonts: &dyn FontSource) -> ResolvedFont {
    let requested = drawing.text_font.as_str();
    let text = drawing.text().unwrap_or_default();

    if is_chinese(text) {
        let candidates = fonts.chinese_families();
        match select_chinese_font(requested, &candidates) {
            Some(family) => {
                if let Some(font) = fonts.load_family(&family) {
                    tracing::debug!("Using installed font '{}' for Chinese text", family);
                    return ResolvedFont::Outline(font);
                }
                tracing::warn!("Chinese font '{}' could not be loaded", family);
            }
            None => {
                tracing::warn!("Watermark text is Chinese but no Chinese font is installed, please install one");
            }
        }
    }

    if !drawing.unselectable {
        if let Some(font) = StandardFont::from_name(requested) {
            return ResolvedFont::Standard(font);
        }
    }

    if let Some(font) = fonts
        .load_family(requested)
        .or_else(|| fonts.load_fallback())
    {
        tracing::debug!("Drawing text with outlines of '{}'", font.family());
        return ResolvedFont::Outline(font);
    }

    tracing::warn!(
        "Font '{}' is not available, falling back to Helvetica",
        requested
    );
    ResolvedFont::Standard(StandardFont::from_name(requested).unwrap_or(StandardFont::Helvetica))
}

/// Explain which characters of `text` the chosen font cannot draw
fn missing_glyph_warning(font: &ResolvedFont, text: &str) -> Option<String> {
    match font {
        ResolvedFont::Standard(standard) if is_chinese(text) => Some(format!(
            "'{}' has no Chinese glyphs, Chinese characters will be replaced by '?'",
            standard.base_font()
        )),
        ResolvedFont::Standard(_) => None,
        ResolvedFont::Outline(outline) => match outline.covers(text) {
            Ok(true) => None,
            Ok(false) => Some(format!(
                "'{}' lacks glyphs for some characters, they will be left out",
                outline.family()
            )),
            Err(e) => Some(e.to_string()),
        },
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use crate::options::WatermarkSource;
    use pretty_assertions::assert_eq;

    fn families(names: &[&str]) -> Vec<String> {
        names.iter().map(|s| s.to_string()).collect()
    }

    /// A font source holding exactly one installed face
    pub(crate) struct SingleFont {
        pub font: OutlineFont,
        pub chinese: bool,
    }

    impl FontSource for SingleFont {
        fn chinese_families(&self) -> Vec<String> {
            if self.chinese {
                vec![self.font.family().to_string()]
            } else {
                Vec::new()
            }
        }

        fn load_family(&self, family: &str) -> Option<OutlineFont> {
            self.font
                .family()
                .eq_ignore_ascii_case(family)
                .then(|| self.font.clone())
        }

        fn load_fallback(&self) -> Option<OutlineFont> {
            Some(self.font.clone())
        }
    }

    /// First installed face that draws `probe` with actual outlines
    fn installed_font_for(probe: &str) -> Option<OutlineFont> {
        let mut db = fontdb::Database::new();
        db.load_system_fonts();
        let found = db.faces().find_map(|face| {
            let family = face.families.first()?.0.clone();
            db.with_face_data(face.id, |data, index| {
                let font = OutlineFont::from_bytes(family.clone(), data.to_vec(), index).ok()?;
                let paths = font.text_operations(probe, 0.0, 0.0, 12.0).ok()?;
                (font.covers(probe).ok()? && !paths.is_empty()).then_some(font)
            })
            .flatten()
        });
        found
    }

    /// Any installed Latin font, or `None` on hosts without fonts
    pub(crate) fn installed_latin_font() -> Option<OutlineFont> {
        installed_font_for("Draft")
    }

    /// Any installed font with Chinese glyphs
    pub(crate) fn installed_chinese_font() -> Option<OutlineFont> {
        installed_font_for("机密")
    }

    #[test]
    fn test_is_chinese() {
        assert!(is_chinese("机密"));
        assert!(is_chinese("Top secret 机密"));
        assert!(!is_chinese("Confidential"));
        assert!(!is_chinese(""));
        // Japanese kana sits outside the unified ideograph block
        assert!(!is_chinese("ひらがな"));
    }

    #[test]
    fn test_requested_font_kept_when_available() {
        let candidates = families(&["AR PL UMing CN", "WenQuanYi Zen Hei"]);
        assert_eq!(
            select_chinese_font("AR PL UMing CN", &candidates),
            Some("AR PL UMing CN".to_string())
        );
    }

    #[test]
    fn test_hei_font_preferred() {
        let candidates = families(&["AR PL UMing CN", "WenQuanYi Zen Hei", "Microsoft YaHei"]);
        assert_eq!(
            select_chinese_font("Helvetica", &candidates),
            Some("WenQuanYi Zen Hei".to_string())
        );
    }

    #[test]
    fn test_hei_at_start_does_not_count() {
        let candidates = families(&["Heiti SC", "Songti SC"]);
        assert_eq!(
            select_chinese_font("Helvetica", &candidates),
            Some("Heiti SC".to_string())
        );
        let candidates = families(&["Songti SC", "Heiti SC"]);
        assert_eq!(
            select_chinese_font("Helvetica", &candidates),
            Some("Songti SC".to_string())
        );
    }

    #[test]
    fn test_no_candidates() {
        assert_eq!(select_chinese_font("Helvetica", &[]), None);
    }

    #[test]
    fn test_resolve_standard_font() {
        let mut drawing = DrawingOptions::new(WatermarkSource::Text("Draft".into()));
        drawing.text_font = "Times-Bold".into();
        let font = resolve_font(&drawing, &NoFonts);
        assert_eq!(font.name(), "Times-Bold");
    }

    #[test]
    fn test_chinese_without_fonts_keeps_requested_font() {
        let drawing = DrawingOptions::new(WatermarkSource::Text("机密".into()));
        let font = resolve_font(&drawing, &NoFonts);
        assert!(matches!(font, ResolvedFont::Standard(StandardFont::Helvetica)));
    }

    #[test]
    fn test_unknown_font_falls_back_to_helvetica() {
        let mut drawing = DrawingOptions::new(WatermarkSource::Text("Draft".into()));
        drawing.text_font = "Comic Sans MS".into();
        let font = resolve_font(&drawing, &NoFonts);
        assert_eq!(font.name(), "Helvetica");
    }

    #[test]
    fn test_unselectable_without_fonts_stays_standard() {
        let mut drawing = DrawingOptions::new(WatermarkSource::Text("Draft".into()));
        drawing.text_font = "Courier".into();
        drawing.unselectable = true;
        let font = resolve_font(&drawing, &NoFonts);
        assert_eq!(font.name(), "Courier");
    }

    #[test]
    fn test_chinese_text_loads_selected_family() {
        let Some(font) = installed_latin_font() else {
            eprintln!("no installed fonts, skipping");
            return;
        };
        let family = font.family().to_string();
        let source = SingleFont {
            font,
            chinese: true,
        };
        let drawing = DrawingOptions::new(WatermarkSource::Text("机密".into()));

        let resolved = resolve_font(&drawing, &source);
        assert!(matches!(resolved, ResolvedFont::Outline(_)));
        assert_eq!(resolved.name(), family);
    }

    #[test]
    fn test_chinese_text_is_drawn_as_paths() {
        let Some(font) = installed_chinese_font() else {
            eprintln!("no Chinese font installed, skipping");
            return;
        };
        let source = SingleFont {
            font,
            chinese: true,
        };
        let drawing = DrawingOptions::new(WatermarkSource::Text("机密".into()));

        let ResolvedFont::Outline(outline) = resolve_font(&drawing, &source) else {
            panic!("expected an outline font");
        };
        assert!(outline.string_width("机密", 12.0).unwrap() > 0.0);

        let ops = outline.text_operations("机密", 10.0, 20.0, 12.0).unwrap();
        assert_eq!(ops[0].operator, "m");
        assert_eq!(ops.last().unwrap().operator, "f");
        assert!(ops.iter().all(|op| op.operator != "Tj"));
        assert_eq!(missing_glyph_warning(&ResolvedFont::Outline(outline), "机密"), None);
    }

    #[test]
    fn test_unselectable_uses_installed_outlines() {
        let Some(font) = installed_latin_font() else {
            eprintln!("no installed fonts, skipping");
            return;
        };
        let family = font.family().to_string();
        let source = SingleFont {
            font,
            chinese: false,
        };
        let mut drawing = DrawingOptions::new(WatermarkSource::Text("Draft".into()));
        drawing.text_font = family.clone();
        drawing.unselectable = true;

        let resolved = resolve_font(&drawing, &source);
        assert!(matches!(resolved, ResolvedFont::Outline(_)));
        assert_eq!(resolved.name(), family);
        assert!(resolved.string_width("Draft", 12.0).unwrap() > 0.0);
    }

    #[test]
    fn test_chinese_on_base_font_warns_about_replacement() {
        let warning = missing_glyph_warning(&ResolvedFont::Standard(StandardFont::Helvetica), "机密")
            .unwrap();
        assert!(warning.contains("Helvetica"));
        assert!(warning.contains("replaced by '?'"));
        assert_eq!(standard::encode_win_ansi("机密"), b"??".to_vec());

        assert_eq!(
            missing_glyph_warning(&ResolvedFont::Standard(StandardFont::Helvetica), "Draft"),
            None
        );
    }

    #[test]
    fn test_needs_installed_fonts() {
        let plain = DrawingOptions::new(WatermarkSource::Text("Draft".into()));
        assert!(!needs_installed_fonts(&plain));

        let chinese = DrawingOptions::new(WatermarkSource::Text("机密".into()));
        assert!(needs_installed_fonts(&chinese));

        let mut unselectable = plain.clone();
        unselectable.unselectable = true;
        assert!(needs_installed_fonts(&unselectable));

        let mut custom = plain.clone();
        custom.text_font = "DejaVu Sans".into();
        assert!(needs_installed_fonts(&custom));

        let image = DrawingOptions::new(WatermarkSource::Image("logo.png".into()));
        assert!(!needs_installed_fonts(&image));
    }
}
