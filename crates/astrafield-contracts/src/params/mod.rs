mod fields;
mod set;
mod value;

pub use fields::{
    find_field, parse_field_input, FieldDefault, FieldGroup, FieldKind, FieldSpec, SliderRange,
    FIELD_SPECS,
};
pub use set::{ParamSet, PartialParams};
pub use value::ParamValue;
