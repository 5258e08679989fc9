use std::path::PathBuf;

use mpcd_walls::{
    geometry::BounceBackGeometryTrait, simulation_parameters::SimulationParams, ChannelSimulation,
};

fn config_path(name: &str) -> PathBuf {
    PathBuf::from(env!("CARGO_MANIFEST_DIR")).join("configs").join(name)
}

#[test]
fn shipped_configs_load_and_run() {
    for name in ["sine_channel.yaml", "moving_slit.yaml"] {
        let params = SimulationParams::load(&config_path(name), None).unwrap();
        let mut sim = ChannelSimulation::new(params, false).unwrap();
        sim.step().unwrap();
        assert!(sim.last_fill().unwrap().total() > 0, "{}", name);
    }
}

#[test]
fn overwrite_file_replaces_top_level_keys() {
    let params = SimulationParams::load(
        &config_path("sine_channel.yaml"),
        Some(config_path("overwrite_short.yaml").as_path()),
    )
    .unwrap();
    assert_eq!(params.dt, 0.05);
    assert_eq!(params.seed, 9);
    assert_eq!(params.geometry.build().unwrap().half_width(), 10.);
}

#[test]
fn missing_file_is_an_io_error() {
    let err = SimulationParams::load(&config_path("does_not_exist.yaml"), None).unwrap_err();
    assert!(matches!(err, mpcd_walls::error::Error::Io(_)));
}
