// This file is part of Metropolis-Calibration.
// Copyright © 2022, 2023, 2024, 2025 André de Palma, Lucas Javaudin
//
// This program is free software: you can redistribute it and/or modify
// it under the terms of the GNU General Public License as published by
// the Free Software Foundation, either version 3 of the License, or
// (at your option) any later version.
//
// This program is distributed in the hope that it will be useful,
// but WITHOUT ANY WARRANTY; without even the implied warranty of
// MERCHANTABILITY or FITNESS FOR A PARTICULAR PURPOSE. See the
// GNU General Public License for more details.
//
// You should have received a copy of the GNU General Public License
// along with this program. If not, see <https://www.gnu.org/licenses/>.

//! End-to-end test: reads input files, runs the calibration and checks the output files.
use std::fs;
use std::path::PathBuf;

use metropolis_calibration::io::json::read_json;
use metropolis_calibration::network::LinkSpeedRecord;
use serde_json::{json, Value};

/// Directory with the input files of a small calibration problem.
///
/// ```text
/// 0 <-> 1 <-> 2 <-> 3 <-> 4
/// ```
///
/// All links are 1 km long, with free-flow speed 20 m/s.
/// The trips are two times slower than the free-flow travel times.
fn write_inputs() -> PathBuf {
    let dir = std::env::temp_dir().join(format!("metropolis_calibration_{}", std::process::id()));
    fs::create_dir_all(&dir).unwrap();
    let nodes: Vec<Value> = (0..5)
        .map(|i| json!({"id": i, "x": 1000.0 * i as f64, "y": 0.0}))
        .collect();
    let mut edges = Vec::new();
    for i in 0..4 {
        edges.push(json!({"id": 2 * i, "source": i, "target": i + 1, "length": 1000.0, "speed": 20.0}));
        edges.push(json!({"id": 2 * i + 1, "source": i + 1, "target": i, "length": 1000.0, "speed": 20.0}));
    }
    let network = json!({"nodes": nodes, "edges": edges});
    let trips = json!([
        // Links are found from the coordinates.
        {"id": 1, "origin": [500.0, 1.0], "destination": [3500.0, 1.0], "pickup_time": 100.0,
         "duration": 300.0},
        {"id": 2, "origin": [0.0, 0.0], "destination": [0.0, 0.0], "origin_link": 0,
         "destination_link": 4, "pickup_time": 1000.0, "duration": 200.0},
        {"id": 3, "origin": [0.0, 0.0], "destination": [0.0, 0.0], "origin_link": 7,
         "destination_link": 3, "pickup_time": 2000.0, "duration": 200.0},
        // Same origin and destination link: the trip is ignored.
        {"id": 4, "origin": [0.0, 0.0], "destination": [0.0, 0.0], "origin_link": 2,
         "destination_link": 2, "pickup_time": 0.0, "duration": 60.0}
    ]);
    let parameters = json!({
        "input_files": {"network": "network.json", "trips": "trips.json"},
        "output_directory": "output",
        "dt": 1800.0,
        "horizon": 7200.0,
        "saving_format": "JSON",
        "max_iterations": 100,
        "tolerance": 0.001,
        "epsilon1": 0.5,
        "epsilon2": 0.2,
        "check_horizon": 5,
        "random_seed": 13,
        "progress_interval": 10,
        "snapshot_interval": 50,
        "checkpoint_interval": 0
    });
    for (name, value) in [
        ("network.json", network),
        ("trips.json", trips),
        ("parameters.json", parameters),
    ] {
        fs::write(dir.join(name), serde_json::to_vec(&value).unwrap()).unwrap();
    }
    dir
}

#[test]
fn run_calibration_test() {
    let dir = write_inputs();
    metropolis_calibration::run_calibration(&dir.join("parameters.json")).unwrap();
    let output = dir.join("output");

    let speeds: Vec<LinkSpeedRecord> = read_json(&output.join("link_speeds.json")).unwrap();
    assert_eq!(speeds.len(), 8);
    assert!(speeds.iter().all(|r| r.speeds.len() == 4));
    // The trips are slower than free flow so some speeds decreased.
    assert!(speeds
        .iter()
        .flat_map(|r| r.speeds.iter())
        .any(|s| s.value() < 20.0));

    let summary: Value = read_json(&output.join("summary.json")).unwrap();
    assert!(summary["iterations"].as_u64().unwrap() <= 100);
    assert!(summary["final_cost"].as_f64().unwrap() < summary["initial_cost"].as_f64().unwrap());

    // Three trips remain after the same-link trip is dropped.
    let initial_ratios: Vec<f64> = read_json(&output.join("diff").join("diffInitial.json")).unwrap();
    assert_eq!(initial_ratios.len(), 3);
    // The links of the first trip depend on which of the two overlapping links is the closest.
    assert!(initial_ratios[0] > 0.0);
    assert!((initial_ratios[1] - 0.5).abs() < 1e-9);
    assert!((initial_ratios[2] - 0.5).abs() < 1e-9);
    assert!(output.join("plot").join("histogram_Initial.json").exists());

    let reports: Vec<Value> = fs::read_to_string(output.join("progress.jsonl"))
        .unwrap()
        .lines()
        .map(|l| serde_json::from_str(l).unwrap())
        .collect();
    assert!(!reports.is_empty());
    assert_eq!(reports[0]["iteration"].as_u64(), Some(10));
    assert!(output.join("log.txt").exists());

    fs::remove_dir_all(&dir).unwrap();
}
