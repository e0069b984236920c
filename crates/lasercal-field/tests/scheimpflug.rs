use approx::assert_relative_eq;
use lasercal_core::{AngleUnit, LaserLine, SensorModel, SensorSize};
use lasercal_field::{
    load_cam_grid_data, wire, BuildSource, CalibrationConfig, CoordinateField, GridBuildParams,
};
use lasercal_grid::{CamGridData, RawGrid};
use nalgebra::Point2;

const SENSOR: usize = 1024;
const PITCH: f64 = 50.0;

/// Chessboard seen with a perspective along the sensor y axis: squares
/// shrink towards the bottom of the image. Corner (0, 0) sits on the
/// sensor centre.
fn perspective_grid() -> CamGridData {
    let c = (SENSOR / 2) as f64;
    let mut grid = RawGrid::new();
    for gy in -9..=9 {
        let w = 1.0 + 0.01 * f64::from(gy);
        let sy = (c + PITCH * f64::from(gy) / w).round() as i32;
        let row = (-9..=9)
            .map(|gx| {
                let sx = (c + PITCH * f64::from(gx) / w).round() as i32;
                Point2::new(sx, sy)
            })
            .collect();
        grid.insert(sy, row);
    }
    let mut data = CamGridData::new(SensorSize::new(SENSOR, SENSOR), 1.35, grid);
    data.set_triangulation_angle_rad(0.6);
    data
}

fn build() -> (CamGridData, CoordinateField) {
    let data = perspective_grid();
    let mut field = CoordinateField::new();
    load_cam_grid_data(&mut field, &data, &GridBuildParams::default()).expect("grid builds");
    (data, field)
}

#[test]
fn all_lines_share_the_laser_plane() {
    let (data, field) = build();
    assert!(field.is_scheimpflug_case());
    assert_eq!(field.sensor_size(), SensorSize::new(SENSOR, SENSOR));

    let n = SENSOR as i32;
    let origin = data.origin();
    let valid = [
        (0, 0),
        (n - 1, 0),
        (0, n - 1),
        (n - 1, n - 1),
        (origin.x as i32, origin.y as i32),
    ];
    for (x, y) in valid {
        let p0 = field.to_3d(x, y, LaserLine::Front).expect("valid");
        for line in [LaserLine::Behind, LaserLine::Center] {
            assert_eq!(field.to_3d(x, y, line), Some(p0));
        }
    }
    for (x, y) in [(-1, -1), (n, 0), (0, n), (n, n)] {
        for line in LaserLine::ALL {
            assert!(field.to_3d(x, y, line).is_none());
        }
    }
}

#[test]
fn origin_and_monotonic_layout() {
    let (data, field) = build();
    let origin = data.origin();
    for line in LaserLine::ALL {
        let p = field
            .to_3d(origin.x as i32, origin.y as i32, line)
            .expect("origin valid");
        assert!(p.x.abs() < 1e-4, "{p:?}");
    }
    assert!(field.check_discontinuities(false, false).is_empty());

    // one square right of the centre is one grid delta away
    let right = field.coordinates(562, 512).expect("valid");
    assert_relative_eq!(f64::from(right.x), 1.35, epsilon = 1e-3);
    assert!(right.y.abs() < 1e-3);
    assert_relative_eq!(
        field.triangulation_angle(AngleUnit::Radians, LaserLine::Behind),
        0.6,
        epsilon = 1e-6
    );
}

#[test]
fn short_vertical_segment_scale() {
    let (_, field) = build();
    for line in LaserLine::ALL {
        let a = field.to_3d_or_zero(100, 97, line);
        let b = field.to_3d_or_zero(100, 107, line);
        let expected = 10.0 / CoordinateField::dist(&a, &b);
        let computed = field.factor_vertical(5, 100, 102, line);
        assert!(computed > 0.0);
        assert_relative_eq!(computed, expected, max_relative = 1e-5);

        // the horizontal plane is only approximated for grid fields
        let approx = field
            .distance_on_horizontal_plane(100, 100, 100, 105)
            .expect("approximation");
        assert!(approx > 0.0);
    }
}

#[test]
fn csv_config_and_wire_round_trip() {
    let dir = tempfile::tempdir().expect("tempdir");
    let csv = dir.path().join("corners.csv");
    let (data, field) = build();
    data.save_csv(&csv).expect("csv written");

    let config_path = dir.path().join("config.json");
    CalibrationConfig::new(BuildSource::Grid {
        csv,
        params: GridBuildParams::default(),
    })
    .write_json(&config_path)
    .expect("config written");
    let from_config = CalibrationConfig::load_json(&config_path)
        .expect("config read")
        .build_field()
        .expect("field from config");
    assert_eq!(from_config.sensor_model(), SensorModel::CalibrationGridOnLaserPlane);
    for (x, y) in [(0, 0), (300, 700), (1023, 1023)] {
        assert_eq!(from_config.coordinates(x, y), field.coordinates(x, y));
    }

    let back = wire::deserialize(&wire::serialize(&field)).expect("decoded");
    for (x, y) in [(3, 5), (512, 512), (700, 1000)] {
        for line in LaserLine::ALL {
            assert_eq!(back.to_3d(x, y, line), field.to_3d(x, y, line));
        }
    }
}
