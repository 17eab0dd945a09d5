pub mod answer_route;
pub mod rag_request;
pub mod search_route;
