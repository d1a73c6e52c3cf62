pub mod color;
pub mod fixture;
pub mod show;
pub mod timeline;

// Re-export commonly used types at the model level.
pub use color::Color;
pub use fixture::{EffectTarget, FixtureDef, FixtureGroup, FixtureId, GroupId, GroupMember};
pub use show::Show;
pub use timeline::{
    BlendMode, EffectInstance, EffectKind, EffectParams, ParamKey, ParamValue, Sequence,
    TimeRange, Track,
};
