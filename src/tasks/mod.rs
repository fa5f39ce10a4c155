mod health_probe;

pub use health_probe::HealthProbe;
