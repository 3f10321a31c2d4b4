//! Base-14 font selection for rebuilt page content.
//!
//! Translated text is rendered with the standard PDF base-14 fonts, chosen
//! to approximate the typeface recorded for each source block. Base-14 fonts
//! need no embedded font program, and with WinAnsiEncoding they cover the
//! Latin-script target languages this tool supports (~256 characters).

/// Standard font a recorded typeface name maps onto.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BaseFont {
    Helvetica,
    HelveticaBold,
    TimesRoman,
    TimesBold,
    Courier,
}

impl BaseFont {
    /// Pick the closest base-14 font for a recorded typeface name.
    ///
    /// Matching is by family keywords; anything unrecognized renders as
    /// Helvetica, which also covers the extractor's fallback font.
    pub fn from_typeface(name: &str) -> Self {
        let lowered = name.to_lowercase();
        let bold = lowered.contains("bold") || lowered.contains("black") || lowered.contains("heavy");

        if lowered.contains("courier") || lowered.contains("mono") {
            Self::Courier
        } else if lowered.contains("times")
            || lowered.contains("serif")
            || lowered.contains("roman")
            || lowered.contains("georgia")
            || lowered.contains("garamond")
        {
            if bold { Self::TimesBold } else { Self::TimesRoman }
        } else if bold {
            Self::HelveticaBold
        } else {
            Self::Helvetica
        }
    }

    /// PDF BaseFont name for the font dictionary.
    pub const fn pdf_name(self) -> &'static str {
        match self {
            Self::Helvetica => "Helvetica",
            Self::HelveticaBold => "Helvetica-Bold",
            Self::TimesRoman => "Times-Roman",
            Self::TimesBold => "Times-Bold",
            Self::Courier => "Courier",
        }
    }

    /// Resource key for this font in a page's Resources/Font dictionary.
    pub const fn resource_key(self) -> &'static str {
        match self {
            Self::Helvetica => "LTHelv",
            Self::HelveticaBold => "LTHelvB",
            Self::TimesRoman => "LTTimes",
            Self::TimesBold => "LTTimesB",
            Self::Courier => "LTCour",
        }
    }

    /// Average character width as a fraction of the font size, used for
    /// word wrapping. Courier is fixed-pitch; the others are estimates.
    pub const fn char_width_factor(self) -> f32 {
        match self {
            Self::Helvetica | Self::HelveticaBold => 0.55,
            Self::TimesRoman | Self::TimesBold => 0.50,
            Self::Courier => 0.60,
        }
    }

    /// All fonts, for building page resources.
    pub const fn all() -> [Self; 5] {
        [
            Self::Helvetica,
            Self::HelveticaBold,
            Self::TimesRoman,
            Self::TimesBold,
            Self::Courier,
        ]
    }
}

/// Encode text for a Tj literal string under WinAnsiEncoding.
///
/// Latin-1 characters above ASCII are written as octal escapes so the
/// stream stays pure ASCII; characters outside Latin-1 degrade to '?'.
/// The PDF string delimiters and the escape character are escaped.
pub fn encode_pdf_literal(text: &str) -> String {
    use std::fmt::Write;

    let mut out = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '(' => out.push_str("\\("),
            ')' => out.push_str("\\)"),
            '\\' => out.push_str("\\\\"),
            c if (c as u32) < 0x20 => out.push(' '),
            c if (c as u32) <= 0x7E => out.push(c),
            c if (c as u32) <= 0xFF => {
                let _ = write!(out, "\\{:03o}", c as u32);
            }
            _ => out.push('?'),
        }
    }
    out
}
