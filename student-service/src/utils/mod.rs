pub mod validation;

pub use validation::ValidatedBody;
