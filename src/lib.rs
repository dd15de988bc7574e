pub mod archive;
pub mod assets;
pub mod fat;
pub mod fetch;
pub mod github;
pub mod package;
pub mod universal;
pub mod validate;
