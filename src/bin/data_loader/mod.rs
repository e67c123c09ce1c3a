pub mod fixture_dto;
pub mod fixture_loader;
