pub mod config_cmd;
pub mod forecast_cmd;
pub mod output;
pub mod renderer;
