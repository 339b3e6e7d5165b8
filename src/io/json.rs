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

//! Reading and writing JSON files, optionally compressed with zstd.
use std::fs::File;
use std::io::{Read, Write};
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use serde::de::DeserializeOwned;
use serde::Serialize;

/// Reads some deserializable data from a JSON file.
///
/// The file is decompressed first if its extension is `.zst`.
pub fn read_json<D: DeserializeOwned>(filename: &Path) -> Result<D> {
    let mut bytes = Vec::new();
    File::open(filename)
        .with_context(|| format!("Unable to open file `{filename:?}`"))?
        .read_to_end(&mut bytes)
        .with_context(|| format!("Unable to read file `{filename:?}`"))?;
    let decoded_bytes = if filename.extension().and_then(|s| s.to_str()) == Some("zst") {
        zstd::decode_all(bytes.as_slice())
            .with_context(|| format!("Unable to decode zstd-compressed file `{filename:?}`"))?
    } else {
        bytes
    };
    let data = serde_json::from_slice(&decoded_bytes)
        .with_context(|| format!("Unable to parse file `{filename:?}`"))?;
    Ok(data)
}

/// Writes some serializable data as an uncompressed JSON file.
///
/// The file is stored in the given directory, with filename "{name}.json".
/// Returns the path of the file.
pub fn write_json<D: Serialize>(data: D, output_dir: &Path, name: &str) -> Result<PathBuf> {
    let filename = output_dir.join(format!("{name}.json"));
    let buffer = serde_json::to_vec(&data)?;
    File::create(&filename)
        .and_then(|mut writer| writer.write_all(&buffer))
        .with_context(|| format!("Unable to write file `{filename:?}`"))?;
    Ok(filename)
}

/// Writes some serializable data as a Zstd compressed JSON file.
///
/// The file is stored in the given directory, with filename "{name}.json.zst".
/// Returns the path of the file.
pub fn write_compressed_json<D: Serialize>(
    data: D,
    output_dir: &Path,
    name: &str,
) -> Result<PathBuf> {
    let filename = output_dir.join(format!("{name}.json.zst"));
    let buffer = serde_json::to_vec(&data)?;
    let encoded_buffer = zstd::encode_all(buffer.as_slice(), 0)?;
    File::create(&filename)
        .and_then(|mut writer| writer.write_all(&encoded_buffer))
        .with_context(|| format!("Unable to write file `{filename:?}`"))?;
    Ok(filename)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn json_files_test() {
        let dir = std::env::temp_dir().join(format!("calibration-json-{}", std::process::id()));
        std::fs::create_dir_all(&dir).unwrap();
        let data = vec![1.5, 2.0, 3.25];
        let plain = write_json(&data, &dir, "plain").unwrap();
        assert_eq!(read_json::<Vec<f64>>(&plain).unwrap(), data);
        let compressed = write_compressed_json(&data, &dir, "compressed").unwrap();
        assert!(compressed.to_str().unwrap().ends_with(".json.zst"));
        assert_eq!(read_json::<Vec<f64>>(&compressed).unwrap(), data);
        assert!(read_json::<Vec<f64>>(&dir.join("missing.json")).is_err());
        std::fs::remove_dir_all(&dir).unwrap();
    }
}
