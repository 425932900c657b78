pub mod site;
pub mod update;
