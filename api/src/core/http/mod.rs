pub mod context_view;
pub mod response_envelope;
