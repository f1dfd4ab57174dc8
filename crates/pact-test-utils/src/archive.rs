//! Archive builders and fake executables.

use std::io::{Cursor, Write};
use std::path::Path;

use flate2::Compression;
use flate2::write::GzEncoder;

/// Build a gzip-compressed tarball of `(path, content)` regular files, mode 0755.
pub fn tar_gz(entries: &[(&str, Vec<u8>)]) -> Vec<u8> {
    let encoder = GzEncoder::new(Vec::new(), Compression::default());
    let mut builder = tar::Builder::new(encoder);
    for (path, content) in entries {
        let mut header = tar::Header::new_gnu();
        header.set_size(content.len() as u64);
        header.set_mode(0o755);
        header.set_cksum();
        builder
            .append_data(&mut header, path, content.as_slice())
            .expect("append tar entry");
    }
    builder
        .into_inner()
        .expect("finish tar")
        .finish()
        .expect("finish gzip")
}

/// Build a zip archive of `(path, content)` regular files, mode 0755.
pub fn zip(entries: &[(&str, Vec<u8>)]) -> Vec<u8> {
    let mut writer = zip::ZipWriter::new(Cursor::new(Vec::new()));
    let options = zip::write::SimpleFileOptions::default().unix_permissions(0o755);
    for (path, content) in entries {
        writer.start_file(*path, options).expect("start zip entry");
        writer.write_all(content).expect("write zip entry");
    }
    writer.finish().expect("finish zip").into_inner()
}

/// Shell script answering `--version` with `"<name> <version>"`.
pub fn version_script(name: &str, version: &str) -> Vec<u8> {
    format!(
        "#!/bin/sh\nif [ \"$1\" = \"--version\" ]; then\n  echo \"{name} {version}\"\n  exit 0\nfi\nexit 0\n"
    )
    .into_bytes()
}

/// Shell script writing its arguments, one per line, to `record` and exiting with `code`.
pub fn recording_script(record: &Path, code: i32) -> Vec<u8> {
    format!(
        "#!/bin/sh\nprintf '%s\\n' \"$@\" > '{}'\nexit {code}\n",
        record.display()
    )
    .into_bytes()
}

/// Shell script that exits with `code`.
pub fn exit_script(code: i32) -> Vec<u8> {
    format!("#!/bin/sh\nexit {code}\n").into_bytes()
}

/// Members of the legacy bundle, relative to the archive's top-level directory.
pub const LEGACY_MEMBERS: [&str; 6] = [
    "bin/pact-broker",
    "bin/pactflow",
    "bin/pact-message",
    "bin/pact-mock-service",
    "bin/pact-provider-verifier",
    "bin/pact-stub-service",
];

/// A legacy bundle tarball under a single `pact/` directory, omitting `skip`.
pub fn legacy_bundle(version: &str, skip: &[&str]) -> Vec<u8> {
    let entries: Vec<(String, Vec<u8>)> = LEGACY_MEMBERS
        .iter()
        .filter(|member| !skip.contains(member))
        .map(|member| {
            let name = member.rsplit('/').next().unwrap_or(member);
            (format!("pact/{member}"), version_script(name, version))
        })
        .chain(std::iter::once((
            "pact/README.md".to_string(),
            b"standalone".to_vec(),
        )))
        .collect();
    let borrowed: Vec<(&str, Vec<u8>)> = entries
        .iter()
        .map(|(path, content)| (path.as_str(), content.clone()))
        .collect();
    tar_gz(&borrowed)
}
