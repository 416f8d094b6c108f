//! Face oracle boundary and the line-delimited JSON sidecar client.
//!
//! Face detection and encoding run out of process. The sidecar reads one
//! request per line on stdin and answers one reply per line on stdout:
//!
//! ```text
//! -> {"image":"/tmp/facegate-frame-1234-0.png"}
//! <- {"faces":[{"box":[top,right,bottom,left],"encoding":[0.01, ...]}]}
//! <- {"error":"cannot decode image"}
//! ```
//!
//! An `error` reply concerns that image only. EOF, a broken pipe or a reply
//! that is not valid JSON means the sidecar is gone or out of sync.

use crate::types::{BoundingBox, Encoding, FaceObservation};
use serde::{Deserialize, Serialize};
use std::io::{BufRead, BufReader, Write};
use std::path::{Path, PathBuf};
use std::process::{Child, ChildStdin, ChildStdout, Command, Stdio};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum OracleError {
    #[error("oracle rejected image: {0}")]
    Rejected(String),
    #[error("invalid frame: {0}")]
    InvalidFrame(String),
    #[error("failed to write scratch image: {0}")]
    Scratch(#[from] image::ImageError),
    #[error("failed to spawn oracle `{command}`: {source}")]
    Spawn {
        command: String,
        source: std::io::Error,
    },
    #[error("oracle pipe: {0}")]
    Io(#[from] std::io::Error),
    #[error("oracle exited")]
    Exited,
    #[error("malformed oracle reply: {0}")]
    Protocol(String),
}

impl OracleError {
    /// Faults that concern one image; the next request is a fresh attempt.
    pub fn is_transient(&self) -> bool {
        matches!(
            self,
            OracleError::Rejected(_) | OracleError::InvalidFrame(_) | OracleError::Scratch(_)
        )
    }
}

/// Opaque face detection + encoding capability.
pub trait FaceOracle {
    /// Detect and encode every face in the image file at `path`.
    fn encode_image(&mut self, path: &Path) -> Result<Vec<FaceObservation>, OracleError>;

    /// Detect and encode every face in a packed RGB8 frame.
    fn encode_rgb(
        &mut self,
        rgb: &[u8],
        width: u32,
        height: u32,
    ) -> Result<Vec<FaceObservation>, OracleError>;
}

#[derive(Serialize)]
struct Request<'a> {
    image: &'a Path,
}

#[derive(Deserialize)]
struct Reply {
    #[serde(default)]
    faces: Vec<WireFace>,
    #[serde(default)]
    error: Option<String>,
}

#[derive(Deserialize)]
struct WireFace {
    #[serde(rename = "box")]
    bbox: [u32; 4],
    encoding: Vec<f32>,
}

/// Request/reply framing over any line-oriented byte stream.
pub struct OracleConnection<R, W> {
    reader: R,
    writer: W,
    line: String,
}

impl<R: BufRead, W: Write> OracleConnection<R, W> {
    pub fn new(reader: R, writer: W) -> Self {
        Self {
            reader,
            writer,
            line: String::new(),
        }
    }

    pub fn request(&mut self, image: &Path) -> Result<Vec<FaceObservation>, OracleError> {
        let req = serde_json::to_string(&Request { image })
            .map_err(|e| OracleError::Protocol(e.to_string()))?;
        self.writer.write_all(req.as_bytes())?;
        self.writer.write_all(b"\n")?;
        self.writer.flush()?;

        self.line.clear();
        if self.reader.read_line(&mut self.line)? == 0 {
            return Err(OracleError::Exited);
        }

        let reply: Reply = serde_json::from_str(self.line.trim_end())
            .map_err(|e| OracleError::Protocol(format!("{e}: {:?}", self.line.trim_end())))?;

        if let Some(err) = reply.error {
            return Err(OracleError::Rejected(err));
        }

        Ok(reply
            .faces
            .into_iter()
            .map(|f| FaceObservation {
                bbox: BoundingBox::from_trbl(f.bbox),
                encoding: Encoding::new(f.encoding),
            })
            .collect())
    }
}

/// Face oracle running as a child process.
pub struct SidecarOracle {
    child: Child,
    conn: OracleConnection<BufReader<ChildStdout>, ChildStdin>,
    scratch: PathBuf,
}

impl SidecarOracle {
    /// Spawn `program args...`. `scratch` is where camera frames are written
    /// before each request; it must be unique per oracle instance.
    pub fn spawn(program: &str, args: &[String], scratch: PathBuf) -> Result<Self, OracleError> {
        let mut child = Command::new(program)
            .args(args)
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::inherit())
            .spawn()
            .map_err(|source| OracleError::Spawn {
                command: program.to_string(),
                source,
            })?;

        let (Some(stdin), Some(stdout)) = (child.stdin.take(), child.stdout.take()) else {
            let _ = child.kill();
            return Err(OracleError::Exited);
        };

        tracing::info!(program, pid = child.id(), scratch = %scratch.display(), "oracle sidecar started");

        Ok(Self {
            child,
            conn: OracleConnection::new(BufReader::new(stdout), stdin),
            scratch,
        })
    }
}

impl FaceOracle for SidecarOracle {
    fn encode_image(&mut self, path: &Path) -> Result<Vec<FaceObservation>, OracleError> {
        self.conn.request(path)
    }

    fn encode_rgb(
        &mut self,
        rgb: &[u8],
        width: u32,
        height: u32,
    ) -> Result<Vec<FaceObservation>, OracleError> {
        let img = image::RgbImage::from_raw(width, height, rgb.to_vec()).ok_or_else(|| {
            OracleError::InvalidFrame(format!(
                "{} bytes is not a {width}x{height} RGB frame",
                rgb.len()
            ))
        })?;
        img.save_with_format(&self.scratch, image::ImageFormat::Png)?;
        let scratch = self.scratch.clone();
        self.conn.request(&scratch)
    }
}

impl Drop for SidecarOracle {
    fn drop(&mut self) {
        let _ = self.child.kill();
        let _ = self.child.wait();
        let _ = std::fs::remove_file(&self.scratch);
    }
}


#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    fn conn(reply: &str) -> OracleConnection<Cursor<Vec<u8>>, Vec<u8>> {
        OracleConnection::new(Cursor::new(reply.as_bytes().to_vec()), Vec::new())
    }

    #[test]
    fn test_request_is_one_json_line() {
        let mut c = conn("{\"faces\":[]}\n");
        c.request(Path::new("/tmp/a.png")).unwrap();
        assert_eq!(c.writer, b"{\"image\":\"/tmp/a.png\"}\n");
    }

    #[test]
    fn test_reply_faces_decoded() {
        let mut c = conn("{\"faces\":[{\"box\":[10,60,90,20],\"encoding\":[0.5,0.25]}]}\n");
        let faces = c.request(Path::new("x.png")).unwrap();
        assert_eq!(faces.len(), 1);
        assert_eq!(faces[0].bbox, BoundingBox::from_trbl([10, 60, 90, 20]));
        assert_eq!(faces[0].encoding.values, vec![0.5, 0.25]);
    }

    #[test]
    fn test_error_reply_is_transient() {
        let mut c = conn("{\"error\":\"cannot decode\"}\n");
        let err = c.request(Path::new("x.png")).unwrap_err();
        assert!(err.is_transient());
        assert!(matches!(err, OracleError::Rejected(m) if m == "cannot decode"));
    }

    #[test]
    fn test_eof_is_fatal() {
        let mut c = conn("");
        let err = c.request(Path::new("x.png")).unwrap_err();
        assert!(matches!(err, OracleError::Exited));
        assert!(!err.is_transient());
    }

    #[test]
    fn test_garbage_is_fatal() {
        let mut c = conn("not json\n");
        let err = c.request(Path::new("x.png")).unwrap_err();
        assert!(matches!(err, OracleError::Protocol(_)));
        assert!(!err.is_transient());
    }

    /// `cat` echoes each request line back, which decodes as an empty reply.
    fn echo_oracle(scratch: PathBuf) -> SidecarOracle {
        SidecarOracle::spawn("cat", &[], scratch).unwrap()
    }

    #[test]
    fn test_encode_rgb_rejects_short_buffer() {
        let dir = tempfile::tempdir().unwrap();
        let scratch = dir.path().join("frame.png");
        let mut oracle = echo_oracle(scratch.clone());

        let err = oracle.encode_rgb(&[0u8; 10], 4, 4).unwrap_err();
        assert!(matches!(err, OracleError::InvalidFrame(_)));
        assert!(err.is_transient());
        assert!(!scratch.exists());
    }

    #[test]
    fn test_encode_rgb_writes_scratch_png() {
        let dir = tempfile::tempdir().unwrap();
        let scratch = dir.path().join("frame.png");
        let mut oracle = echo_oracle(scratch.clone());

        let faces = oracle.encode_rgb(&[200u8; 4 * 3 * 3], 4, 3).unwrap();
        assert!(faces.is_empty());
        let written = image::open(&scratch).unwrap().to_rgb8();
        assert_eq!(written.dimensions(), (4, 3));

        drop(oracle);
        assert!(!scratch.exists());
    }

    #[test]
    fn test_spawn_missing_program() {
        let err = SidecarOracle::spawn("/nonexistent/facegate-oracle", &[], PathBuf::from("x.png"))
            .err()
            .unwrap();
        assert!(matches!(err, OracleError::Spawn { .. }));
    }

    #[test]
    fn test_consecutive_requests() {
        let mut c = conn("{\"faces\":[]}\n{\"faces\":[{\"box\":[0,1,1,0],\"encoding\":[]}]}\n");
        assert!(c.request(Path::new("a.png")).unwrap().is_empty());
        assert_eq!(c.request(Path::new("b.png")).unwrap().len(), 1);
    }
}
