//! Fakes for the process and download seams.

#![allow(dead_code)]

use async_trait::async_trait;
use flate2::Compression;
use flate2::write::GzEncoder;
use provision_core::{CommandOutput, CommandRunner, CommandSpec, Downloader, Error, Result};
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Mutex;

/// Build a gzipped tarball from `(path, contents)` pairs.
pub fn tarball(entries: &[(&str, &[u8])]) -> Vec<u8> {
    let mut builder = tar::Builder::new(GzEncoder::new(Vec::new(), Compression::fast()));
    for (path, data) in entries {
        let mut header = tar::Header::new_gnu();
        header.set_size(data.len() as u64);
        header.set_mode(0o755);
        builder.append_data(&mut header, path, *data).unwrap();
    }
    builder.into_inner().unwrap().finish().unwrap()
}

/// A Go release tarball as go.dev ships it: a single `go/` directory.
pub fn go_release() -> Vec<u8> {
    tarball(&[
        ("go/bin/go", b"#!/bin/sh\n"),
        ("go/bin/gofmt", b"#!/bin/sh\n"),
        ("go/VERSION", b"go1.24.5"),
    ])
}

/// What a fake program does when run.
#[derive(Clone)]
pub enum Behavior {
    /// Exit with this code.
    Exit(i32),
    /// Fail to spawn with this error kind.
    SpawnError(std::io::ErrorKind),
    /// Exit 0 after creating the file at `GOPATH/bin/<name>`.
    InstallInto(String),
    /// Exit with this code and print the given stdout.
    Output(i32, String),
}

/// Recording [`CommandRunner`] keyed by program name.
///
/// Programs without a configured behavior exit 0.
#[derive(Default)]
pub struct FakeRunner {
    behaviors: Mutex<HashMap<String, Vec<(Option<String>, Behavior)>>>,
    calls: Mutex<Vec<CommandSpec>>,
}

impl FakeRunner {
    pub fn new() -> Self {
        Self::default()
    }

    /// Behavior for every invocation of `program`.
    pub fn on(self, program: &str, behavior: Behavior) -> Self {
        self.behaviors
            .lock()
            .unwrap()
            .entry(program.to_string())
            .or_default()
            .push((None, behavior));
        self
    }

    /// Behavior for invocations of `program` whose first argument is `first_arg`.
    pub fn on_arg(self, program: &str, first_arg: &str, behavior: Behavior) -> Self {
        self.behaviors
            .lock()
            .unwrap()
            .entry(program.to_string())
            .or_default()
            .push((Some(first_arg.to_string()), behavior));
        self
    }

    pub fn calls(&self) -> Vec<CommandSpec> {
        self.calls.lock().unwrap().clone()
    }

    pub fn programs(&self) -> Vec<String> {
        self.calls().iter().map(CommandSpec::program_name).collect()
    }

    fn behavior(&self, command: &CommandSpec) -> Behavior {
        let first = command
            .args
            .first()
            .map(|a| a.to_string_lossy().into_owned());
        let behaviors = self.behaviors.lock().unwrap();
        let Some(candidates) = behaviors.get(&command.program_name()) else {
            return Behavior::Exit(0);
        };
        candidates
            .iter()
            .find(|(arg, _)| arg.is_some() && *arg == first)
            .or_else(|| candidates.iter().find(|(arg, _)| arg.is_none()))
            .map_or(Behavior::Exit(0), |(_, b)| b.clone())
    }

    fn execute(&self, command: &CommandSpec) -> std::io::Result<CommandOutput> {
        self.calls.lock().unwrap().push(command.clone());
        match self.behavior(command) {
            Behavior::Exit(code) => Ok(CommandOutput {
                exit_code: code,
                ..CommandOutput::default()
            }),
            Behavior::SpawnError(kind) => Err(std::io::Error::from(kind)),
            Behavior::InstallInto(name) => {
                let gopath = command
                    .env_value("GOPATH")
                    .expect("install invoked without GOPATH");
                let bin = Path::new(gopath).join("bin");
                std::fs::create_dir_all(&bin)?;
                std::fs::write(bin.join(name), b"#!/bin/sh\n")?;
                Ok(CommandOutput::default())
            }
            Behavior::Output(code, stdout) => Ok(CommandOutput {
                exit_code: code,
                stdout,
                stderr: String::new(),
            }),
        }
    }
}

#[async_trait]
impl CommandRunner for FakeRunner {
    async fn status(&self, command: &CommandSpec) -> std::io::Result<i32> {
        self.execute(command).map(|o| o.exit_code)
    }

    async fn output(&self, command: &CommandSpec) -> std::io::Result<CommandOutput> {
        self.execute(command)
    }
}

/// [`Downloader`] serving fixed bytes or a fixed failure.
pub struct FakeDownloader {
    body: Option<Vec<u8>>,
    destinations: Mutex<Vec<PathBuf>>,
}

impl FakeDownloader {
    pub fn serving(body: Vec<u8>) -> Self {
        Self {
            body: Some(body),
            destinations: Mutex::new(Vec::new()),
        }
    }

    pub fn failing() -> Self {
        Self {
            body: None,
            destinations: Mutex::new(Vec::new()),
        }
    }

    pub fn destinations(&self) -> Vec<PathBuf> {
        self.destinations.lock().unwrap().clone()
    }
}

#[async_trait]
impl Downloader for FakeDownloader {
    async fn download(&self, url: &str, dest: &Path) -> Result<u64> {
        self.destinations.lock().unwrap().push(dest.to_path_buf());
        match &self.body {
            Some(body) => {
                std::fs::write(dest, body).map_err(|e| Error::io(e, dest, "write"))?;
                Ok(body.len() as u64)
            }
            None => {
                // Leave a partial file behind, as an interrupted transfer would
                std::fs::write(dest, b"partial").map_err(|e| Error::io(e, dest, "write"))?;
                Err(Error::fetch(url, "connection reset"))
            }
        }
    }
}
