//! Utility helpers: serialization helpers (JSON serializers for persisted state).
pub mod serialization;

pub use serialization::JsonSerializer;
pub use serialization::Serializer;
