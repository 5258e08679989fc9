use mpcd_walls::{
    assert_ft_approx_eq,
    floating_type_mod::{FT, TAU},
    geometry::{BounceBackGeometry, BounceBackGeometryTrait, Location, SineGeometry, SlitGeometry},
    simulation_parameters::BoundaryCondition,
    vec3f, V3,
};
use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;

fn sine(bc: BoundaryCondition, wall_velocity: FT) -> BounceBackGeometry {
    // wavenumber 0.1
    SineGeometry::new(10., 2., TAU / 0.1, wall_velocity, bc).unwrap().into()
}

#[test]
fn particle_just_beyond_the_high_wall() {
    let g = sine(BoundaryCondition::NoSlip, 0.);
    let pos = vec3f(0., 10.5, 0.);
    let vel = vec3f(0., -1., 0.);
    assert_eq!(g.locate(pos), Location::OutsideHigh);

    let (new_pos, new_vel) = g.reflect(pos, vel, 0.01);
    assert_eq!(new_vel, vec3f(0., 1., 0.));
    assert_ft_approx_eq(new_pos.y, 9.5, 1e-12, || "mirrored y".into());
    assert_eq!(g.locate(new_pos), Location::Inside);
}

#[test]
fn points_between_the_walls_are_inside() {
    let g = sine(BoundaryCondition::NoSlip, 0.);
    let mut rng = ChaCha8Rng::seed_from_u64(1);
    for _ in 0..10_000 {
        let x: FT = rng.gen_range(-200.0..200.0);
        let h = g.wall_offset(x);
        let y = h + rng.gen_range(-0.999..0.999) * g.half_width();
        assert_eq!(g.locate(vec3f(x, y, 0.)), Location::Inside);
    }
}

fn random_crossing(g: &BounceBackGeometry, rng: &mut ChaCha8Rng) -> (V3, V3, FT) {
    loop {
        let x: FT = rng.gen_range(-100.0..100.0);
        let start = vec3f(x, g.wall_offset(x) + rng.gen_range(-9.0..9.0), rng.gen_range(-5.0..5.0));
        let vel = vec3f(rng.gen_range(-2.0..2.0), rng.gen_range(-3.0..3.0), rng.gen_range(-1.0..1.0));
        let dt = 0.5;
        let pos = start + vel * dt;
        if g.locate(start) == Location::Inside && g.locate(pos) != Location::Inside {
            return (pos, vel, dt);
        }
    }
}

#[test]
fn no_slip_reverses_relative_velocity() {
    let u = 0.3;
    let g = sine(BoundaryCondition::NoSlip, u);
    let mut rng = ChaCha8Rng::seed_from_u64(2);
    for _ in 0..1000 {
        let (pos, vel, dt) = random_crossing(&g, &mut rng);
        let (_, new_vel) = g.reflect(pos, vel, dt);
        let expected = vec3f(2. * u, 0., 0.) - vel;
        assert!((new_vel - expected).norm() < 1e-12);
    }
}

#[test]
fn no_slip_returns_particles_inside() {
    let g = sine(BoundaryCondition::NoSlip, 0.);
    let mut rng = ChaCha8Rng::seed_from_u64(5);
    for _ in 0..1000 {
        let (pos, vel, dt) = random_crossing(&g, &mut rng);
        let (new_pos, new_vel) = g.reflect(pos, vel, dt);
        assert_eq!(new_vel, -vel);
        assert_eq!(g.locate(new_pos), Location::Inside, "pos {:?} vel {:?}", pos, vel);
    }
}

#[test]
fn slip_preserves_tangential_component() {
    let g = sine(BoundaryCondition::Slip, 0.);
    let mut rng = ChaCha8Rng::seed_from_u64(3);
    for _ in 0..1000 {
        let (pos, vel, dt) = random_crossing(&g, &mut rng);
        let c = g.collide(pos, vel, dt).unwrap();
        let n = g.wall_normal(c.position.x).normalize();

        let tangential_in = vel - n * vel.dot(&n);
        let tangential_out = c.velocity - n * c.velocity.dot(&n);
        assert!((tangential_in - tangential_out).norm() < 1e-9);
        assert_ft_approx_eq(c.velocity.dot(&n), -vel.dot(&n), 1e-9, || "normal component".into());
        assert!(c.dt_remaining > 0. && c.dt_remaining <= dt);
        // lands on the wall
        let side = g.locate(pos).side().unwrap();
        assert_ft_approx_eq(c.position.y, g.wall_position(c.position.x, side), 1e-9, || "wall hit".into());
    }
}

#[test]
fn flat_stationary_wall_slip_and_no_slip_agree_on_normal() {
    let no_slip: BounceBackGeometry = SlitGeometry::new(5., 0., BoundaryCondition::NoSlip).unwrap().into();
    let slip: BounceBackGeometry = SineGeometry::new(5., 0., 7., 0., BoundaryCondition::Slip).unwrap().into();

    let pos = vec3f(1., -5.4, 0.3);
    let vel = vec3f(0.7, -2., 0.4);
    let a = no_slip.collide(pos, vel, 0.5).unwrap();
    let b = slip.collide(pos, vel, 0.5).unwrap();
    assert_eq!(a.velocity.y, b.velocity.y);
    assert_eq!(a.velocity.y, 2.);
    assert_ft_approx_eq(a.dt_remaining, b.dt_remaining, 1e-12, || "remaining time".into());
    assert_ft_approx_eq(a.position.y, -5., 1e-12, || "wall".into());
}

#[test]
fn accessors() {
    let g: BounceBackGeometry = SineGeometry::from_channel(40., 12., 8., 2, 0.25, BoundaryCondition::Slip)
        .unwrap()
        .into();
    assert_eq!(g.get_h(), 10.);
    assert_eq!(g.amplitude(), 2.);
    assert_eq!(g.get_velocity(), 0.25);
    assert_eq!(g.get_boundary_condition(), BoundaryCondition::Slip);
    assert!(g.collide(vec3f(0., 0., 0.), vec3f(1., 1., 1.), 0.1).is_none());
}
