pub mod blacklisted_token;
pub mod movie;
pub mod rating;
pub mod reported_movie;
pub mod user;
