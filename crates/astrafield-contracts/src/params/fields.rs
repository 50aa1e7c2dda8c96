use super::value::ParamValue;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum FieldGroup {
    Output,
    Grid,
    Layers,
    Dots,
    Lines,
    Contours,
    Arcs,
    Blocks,
}

impl FieldGroup {
    /// Panel order.
    pub const ALL: [FieldGroup; 8] = [
        FieldGroup::Output,
        FieldGroup::Grid,
        FieldGroup::Layers,
        FieldGroup::Dots,
        FieldGroup::Lines,
        FieldGroup::Contours,
        FieldGroup::Arcs,
        FieldGroup::Blocks,
    ];

    pub fn title(self) -> &'static str {
        match self {
            FieldGroup::Output => "Image & Palette",
            FieldGroup::Grid => "Grid",
            FieldGroup::Layers => "Layers",
            FieldGroup::Dots => "Dots",
            FieldGroup::Lines => "Lines",
            FieldGroup::Contours => "Contours",
            FieldGroup::Arcs => "Arcs",
            FieldGroup::Blocks => "Blocks",
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum FieldKind {
    Number,
    Toggle,
    Color,
    Text,
}

impl FieldKind {
    /// Parses user input for a field of this kind.
    pub fn parse(self, raw: &str) -> Result<ParamValue, String> {
        let trimmed = raw.trim();
        match self {
            FieldKind::Number => trimmed
                .parse::<f64>()
                .ok()
                .filter(|value| value.is_finite())
                .map(ParamValue::Number)
                .ok_or_else(|| format!("expected a number, got '{trimmed}'")),
            FieldKind::Toggle => match trimmed.to_ascii_lowercase().as_str() {
                "true" | "on" | "yes" | "1" => Ok(ParamValue::Bool(true)),
                "false" | "off" | "no" | "0" => Ok(ParamValue::Bool(false)),
                _ => Err(format!("expected on/off, got '{trimmed}'")),
            },
            FieldKind::Color | FieldKind::Text => Ok(ParamValue::text(trimmed)),
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq)]
pub enum FieldDefault {
    Number(f64),
    Bool(bool),
    Text(&'static str),
}

impl FieldDefault {
    pub fn to_value(self) -> ParamValue {
        match self {
            FieldDefault::Number(value) => ParamValue::Number(value),
            FieldDefault::Bool(value) => ParamValue::Bool(value),
            FieldDefault::Text(value) => ParamValue::text(value),
        }
    }
}

/// Slider bounds. Advisory only: values outside are still stored and sent.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct SliderRange {
    pub min: f64,
    pub max: f64,
    pub step: f64,
}

impl SliderRange {
    pub fn contains(&self, value: f64) -> bool {
        value >= self.min && value <= self.max
    }
}

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct FieldSpec {
    pub key: &'static str,
    pub group: FieldGroup,
    pub label: &'static str,
    pub kind: FieldKind,
    pub default: FieldDefault,
    pub range: Option<SliderRange>,
}

impl FieldSpec {
    pub fn advisory_note(&self, value: &ParamValue) -> Option<String> {
        let range = self.range?;
        let number = value.as_f64()?;
        if range.contains(number) {
            return None;
        }
        Some(format!(
            "{} = {} is outside the slider range {}..{}",
            self.key,
            value.form_text(),
            ParamValue::Number(range.min).form_text(),
            ParamValue::Number(range.max).form_text(),
        ))
    }
}

const fn number(
    key: &'static str,
    group: FieldGroup,
    label: &'static str,
    default: f64,
    range: Option<(f64, f64, f64)>,
) -> FieldSpec {
    FieldSpec {
        key,
        group,
        label,
        kind: FieldKind::Number,
        default: FieldDefault::Number(default),
        range: match range {
            Some((min, max, step)) => Some(SliderRange { min, max, step }),
            None => None,
        },
    }
}

const fn toggle(key: &'static str, label: &'static str, default: bool) -> FieldSpec {
    FieldSpec {
        key,
        group: FieldGroup::Layers,
        label,
        kind: FieldKind::Toggle,
        default: FieldDefault::Bool(default),
        range: None,
    }
}

const fn text(
    key: &'static str,
    label: &'static str,
    kind: FieldKind,
    default: &'static str,
) -> FieldSpec {
    FieldSpec {
        key,
        group: FieldGroup::Output,
        label,
        kind,
        default: FieldDefault::Text(default),
        range: None,
    }
}

/// Every generation parameter, in form order.
pub const FIELD_SPECS: &[FieldSpec] = &[
    // output & grade
    number(
        "size",
        FieldGroup::Output,
        "Output Size",
        1024.0,
        Some((512.0, 2048.0, 128.0)),
    ),
    text("tone_lo", "Low Tone", FieldKind::Color, "#050a10"),
    text("tone_hi", "High Tone", FieldKind::Color, "#12cabf"),
    number(
        "tone_strength",
        FieldGroup::Output,
        "Tone Strength",
        0.9,
        Some((0.0, 1.0, 0.01)),
    ),
    text("seed", "Seed (optional)", FieldKind::Text, ""),
    // grid
    number("grid_n", FieldGroup::Grid, "Grid Cells", 16.0, None),
    // toggles
    toggle("use_dots", "Dots", false),
    toggle("use_lines", "Lines", true),
    toggle("use_contours", "Contours", true),
    toggle("use_arcs", "Arcs", true),
    toggle("use_blocks", "Blocks", true),
    // dots
    number(
        "dot_step",
        FieldGroup::Dots,
        "Dot Step",
        40.0,
        Some((10.0, 120.0, 1.0)),
    ),
    number(
        "dot_min",
        FieldGroup::Dots,
        "Dot Size (min)",
        1.0,
        Some((0.2, 20.0, 0.2)),
    ),
    number(
        "dot_max",
        FieldGroup::Dots,
        "Dot Size (max)",
        9.0,
        Some((0.2, 20.0, 0.2)),
    ),
    // lines
    number(
        "line_angle_deg",
        FieldGroup::Lines,
        "Angle",
        22.0,
        Some((-90.0, 90.0, 1.0)),
    ),
    number(
        "line_density",
        FieldGroup::Lines,
        "Density",
        110.0,
        Some((10.0, 300.0, 1.0)),
    ),
    number(
        "line_lw",
        FieldGroup::Lines,
        "Thickness",
        1.0,
        Some((0.5, 5.0, 0.1)),
    ),
    number(
        "line_alpha",
        FieldGroup::Lines,
        "Opacity",
        0.22,
        Some((0.0, 1.0, 0.01)),
    ),
    // contours
    number(
        "contour_levels",
        FieldGroup::Contours,
        "Levels",
        8.0,
        Some((2.0, 30.0, 1.0)),
    ),
    number(
        "contour_alpha",
        FieldGroup::Contours,
        "Opacity",
        0.30,
        Some((0.0, 1.0, 0.01)),
    ),
    number(
        "contour_lw",
        FieldGroup::Contours,
        "Thickness",
        1.1,
        Some((0.5, 6.0, 0.1)),
    ),
    // arcs
    number(
        "arc_count",
        FieldGroup::Arcs,
        "Count",
        6.0,
        Some((1.0, 20.0, 1.0)),
    ),
    number(
        "arc_rmin",
        FieldGroup::Arcs,
        "Inner Radius",
        0.07,
        Some((0.02, 0.5, 0.002)),
    ),
    number(
        "arc_rmax",
        FieldGroup::Arcs,
        "Outer Radius",
        0.24,
        Some((0.02, 0.8, 0.002)),
    ),
    number(
        "arc_jitter",
        FieldGroup::Arcs,
        "Jitter",
        0.012,
        Some((0.0, 0.05, 0.001)),
    ),
    number(
        "arc_lw",
        FieldGroup::Arcs,
        "Thickness",
        2.0,
        Some((0.5, 8.0, 0.1)),
    ),
    number(
        "arc_alpha",
        FieldGroup::Arcs,
        "Opacity",
        0.9,
        Some((0.0, 1.0, 0.01)),
    ),
    // blocks
    number(
        "block_count",
        FieldGroup::Blocks,
        "Block Count",
        2.0,
        Some((0.0, 8.0, 1.0)),
    ),
];

pub fn find_field(key: &str) -> Option<&'static FieldSpec> {
    FIELD_SPECS.iter().find(|spec| spec.key == key)
}

/// Types console input by the field's control; unknown keys are inferred.
pub fn parse_field_input(key: &str, raw: &str) -> Result<ParamValue, String> {
    match find_field(key) {
        Some(spec) => spec.kind.parse(raw),
        None => Ok(ParamValue::infer(raw)),
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashSet;

    use super::{find_field, parse_field_input, FieldKind, FIELD_SPECS};
    use crate::params::ParamValue;

    #[test]
    fn field_keys_are_unique() {
        let keys: HashSet<&str> = FIELD_SPECS.iter().map(|spec| spec.key).collect();
        assert_eq!(keys.len(), FIELD_SPECS.len());
        assert_eq!(FIELD_SPECS.len(), 28);
    }

    #[test]
    fn defaults_sit_inside_their_slider_ranges() {
        for spec in FIELD_SPECS {
            let value = spec.default.to_value();
            assert_eq!(spec.advisory_note(&value), None, "{}", spec.key);
        }
    }

    #[test]
    fn advisory_note_reports_out_of_range_numbers() {
        let size = find_field("size").map(|spec| spec.advisory_note(&ParamValue::Number(4096.0)));
        assert_eq!(
            size,
            Some(Some(
                "size = 4096 is outside the slider range 512..2048".to_string()
            ))
        );
        let grid = find_field("grid_n").and_then(|spec| spec.advisory_note(&ParamValue::Number(99.0)));
        assert_eq!(grid, None);
    }

    #[test]
    fn kind_parse_matches_control_type() {
        assert_eq!(FieldKind::Number.parse(" 0.5 "), Ok(ParamValue::Number(0.5)));
        assert!(FieldKind::Number.parse("abc").is_err());
        assert_eq!(FieldKind::Toggle.parse("on"), Ok(ParamValue::Bool(true)));
        assert_eq!(FieldKind::Toggle.parse("False"), Ok(ParamValue::Bool(false)));
        assert!(FieldKind::Toggle.parse("maybe").is_err());
        assert_eq!(FieldKind::Text.parse("42"), Ok(ParamValue::text("42")));
        assert_eq!(FieldKind::Color.parse("#ffffff"), Ok(ParamValue::text("#ffffff")));
    }

    #[test]
    fn parse_field_input_uses_descriptor_kind() {
        assert_eq!(parse_field_input("seed", "42"), Ok(ParamValue::text("42")));
        assert_eq!(parse_field_input("size", "1536"), Ok(ParamValue::Number(1536.0)));
        assert!(parse_field_input("use_arcs", "sometimes").is_err());
        assert_eq!(parse_field_input("mystery", "3"), Ok(ParamValue::Number(3.0)));
    }
}
