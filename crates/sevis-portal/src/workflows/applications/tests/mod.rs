mod common;
mod roles;
