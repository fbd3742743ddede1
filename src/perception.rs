// Perception adapter: hand keypoints and face boxes for a camera frame.
//
// The detection itself lives outside this crate. [`SubprocessPerceiver`]
// talks to a MediaPipe helper process over stdin/stdout; [`SimulatedPerceiver`]
// fakes a hand (and optionally a face) from the mouse so the app runs with
// no detector installed.
//
// # Wire format
//
// Startup: the helper prints one line, `READY`.
//
// Per frame, we write `width: u32 LE`, `height: u32 LE`, `channels: u32 LE`
// (always 3) and then `width * height * 3` bytes of RGB. The helper answers
// with one JSON line, coordinates normalized to `0..1`:
//
// ```json
// {"hands": [{"score": 0.93, "landmarks": [{"x": 0.51, "y": 0.42}, ...]}],
//  "faces": [{"score": 0.88, "bbox": [0.30, 0.10, 0.25, 0.33]}],
//  "error": null}
// ```
//
// Landmark ids are the position in the `landmarks` array.

use crate::config::{Config, UiFinger};
use crate::error::{Error, Result};
use crate::gesture::landmarks;
use crate::types::{BoundingBox, FaceDetection, FrameBuffer, Point};
use log::{debug, info, warn};
use serde::Deserialize;
use std::io::{BufRead, BufReader, Write};
use std::process::{Child, ChildStdin, ChildStdout, Command, Stdio};

/// One labelled hand landmark in pixel space.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Keypoint {
    pub id: usize,
    pub point: Point,
}

#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Hand {
    pub keypoints: Vec<Keypoint>,
}

impl Hand {
    pub fn keypoint(&self, id: usize) -> Option<Point> {
        self.keypoints.iter().find(|k| k.id == id).map(|k| k.point)
    }
}

/// Everything the detectors saw in one frame.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Perception {
    pub hands: Vec<Hand>,
    pub faces: Vec<FaceDetection>,
}

pub trait Perceiver {
    fn detect(&mut self, frame: &FrameBuffer) -> Result<Perception>;
}

/* ------------------------------- subprocess ------------------------------- */

#[derive(Deserialize, Debug)]
struct LandmarkJson {
    x: f32,
    y: f32,
}

fn full_score() -> f32 {
    1.0
}

#[derive(Deserialize, Debug)]
struct HandJson {
    #[serde(default = "full_score")]
    score: f32,
    landmarks: Vec<LandmarkJson>,
}

#[derive(Deserialize, Debug)]
struct FaceJson {
    #[serde(default = "full_score")]
    score: f32,
    bbox: [f32; 4],
}

#[derive(Deserialize, Debug)]
struct DetectionResult {
    #[serde(default)]
    hands: Vec<HandJson>,
    #[serde(default)]
    faces: Vec<FaceJson>,
    #[serde(default)]
    error: Option<String>,
}

/// Thresholds applied to detector output.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct DetectorSettings {
    pub max_hands: usize,
    pub hand_confidence: f32,
    pub tracking_confidence: f32,
    pub face_confidence: f32,
}

impl DetectorSettings {
    pub fn from_config(config: &Config) -> Self {
        Self {
            max_hands: config.max_hands,
            hand_confidence: config.hand_detection_confidence,
            tracking_confidence: config.hand_tracking_confidence,
            face_confidence: config.face_detection_confidence,
        }
    }
}

// Normalized → pixel, truncating like `int(v * size)`.
fn to_pixel(v: f32, size: usize) -> i32 {
    (v * size as f32) as i32
}

/// Parse one helper response line into pixel-space detections.
fn parse_detections(
    line: &str,
    width: usize,
    height: usize,
    settings: &DetectorSettings,
) -> Result<Perception> {
    let result: DetectionResult = serde_json::from_str(line.trim())?;

    if let Some(error) = result.error {
        warn!("Detector reported an error: {error}");
        return Ok(Perception::default());
    }

    let hands = result
        .hands
        .into_iter()
        .filter(|h| h.score >= settings.hand_confidence)
        .take(settings.max_hands)
        .map(|h| {
            if h.landmarks.len() != landmarks::COUNT {
                debug!("Expected {} landmarks, got {}", landmarks::COUNT, h.landmarks.len());
            }
            Hand {
                keypoints: h
                    .landmarks
                    .iter()
                    .enumerate()
                    .map(|(id, lm)| Keypoint {
                        id,
                        point: Point::new(to_pixel(lm.x, width), to_pixel(lm.y, height)),
                    })
                    .collect(),
            }
        })
        .collect();

    let faces = result
        .faces
        .into_iter()
        .filter(|f| f.score >= settings.face_confidence)
        .map(|f| {
            let [x, y, w, h] = f.bbox;
            FaceDetection::from_bbox(BoundingBox::new(
                to_pixel(x, width),
                to_pixel(y, height),
                to_pixel(w, width),
                to_pixel(h, height),
            ))
        })
        .collect();

    Ok(Perception { hands, faces })
}

/// Hand + face detector running as a child process.
pub struct SubprocessPerceiver {
    process: Child,
    stdin: ChildStdin,
    stdout_reader: BufReader<ChildStdout>,
    settings: DetectorSettings,
    // Reused RGB byte buffer for the outgoing frame.
    scratch: Vec<u8>,
}

impl SubprocessPerceiver {
    /// Start the helper and wait for its `READY` line.
    pub fn spawn(command: &[String], settings: DetectorSettings) -> Result<Self> {
        let (program, args) = command
            .split_first()
            .ok_or_else(|| Error::Perception("empty detector command".into()))?;

        info!("Starting detector subprocess: {}", command.join(" "));

        let mut process = Command::new(program)
            .args(args)
            .arg("--max-hands")
            .arg(settings.max_hands.to_string())
            .arg("--hand-confidence")
            .arg(settings.hand_confidence.to_string())
            .arg("--tracking-confidence")
            .arg(settings.tracking_confidence.to_string())
            .arg("--face-confidence")
            .arg(settings.face_confidence.to_string())
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::inherit())
            .spawn()
            .map_err(|e| Error::Perception(format!("spawn {program}: {e}")))?;

        let stdin = process
            .stdin
            .take()
            .ok_or_else(|| Error::Perception("detector stdin unavailable".into()))?;
        let stdout = process
            .stdout
            .take()
            .ok_or_else(|| Error::Perception("detector stdout unavailable".into()))?;
        let mut stdout_reader = BufReader::new(stdout);

        let mut ready_line = String::new();
        stdout_reader.read_line(&mut ready_line)?;
        if ready_line.trim() != "READY" {
            let _ = process.kill();
            return Err(Error::Perception(format!(
                "detector did not signal ready, got: {:?}",
                ready_line.trim()
            )));
        }

        info!("Detector ready");

        Ok(Self { process, stdin, stdout_reader, settings, scratch: Vec::new() })
    }
}

impl Perceiver for SubprocessPerceiver {
    fn detect(&mut self, frame: &FrameBuffer) -> Result<Perception> {
        self.scratch.clear();
        self.scratch.reserve(frame.pixels.len() * 3);
        for &px in &frame.pixels {
            self.scratch.extend_from_slice(&[(px >> 16) as u8, (px >> 8) as u8, px as u8]);
        }

        self.stdin.write_all(&(frame.width as u32).to_le_bytes())?;
        self.stdin.write_all(&(frame.height as u32).to_le_bytes())?;
        self.stdin.write_all(&3u32.to_le_bytes())?;
        self.stdin.write_all(&self.scratch)?;
        self.stdin.flush()?;

        let mut response = String::new();
        if self.stdout_reader.read_line(&mut response)? == 0 {
            return Err(Error::Perception("detector closed its output".into()));
        }

        parse_detections(&response, frame.width, frame.height, &self.settings)
    }
}

impl Drop for SubprocessPerceiver {
    fn drop(&mut self) {
        let _ = self.process.kill();
        let _ = self.process.wait();
    }
}

/* ------------------------------- simulation ------------------------------- */

/// Mouse state sampled from the window each frame.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct SimInput {
    pub cursor: Option<Point>,
    /// Left button: index finger drawing at the cursor.
    pub draw: bool,
    /// Right button: "V" pose with the UI fingertip at the cursor.
    pub point: bool,
    /// Hold F: a face centred on the cursor.
    pub face: bool,
}

pub const SIM_FACE_SIZE: i32 = 160;

/// Fakes one hand from the mouse.
pub struct SimulatedPerceiver {
    ui_finger: UiFinger,
    input: SimInput,
}

impl SimulatedPerceiver {
    pub fn new(ui_finger: UiFinger) -> Self {
        Self { ui_finger, input: SimInput::default() }
    }

    pub fn set_input(&mut self, input: SimInput) {
        self.input = input;
    }

    fn hand_at(&self, c: Point) -> Option<Hand> {
        let offset = |dx, dy| c + Point::new(dx, dy);
        let points = if self.input.draw {
            // Index extended at the cursor; middle and pinky curled under it.
            [
                (landmarks::INDEX_FINGER_TIP, c),
                (landmarks::MIDDLE_FINGER_MCP, offset(10, 60)),
                (landmarks::MIDDLE_FINGER_TIP, offset(12, 80)),
                (landmarks::PINKY_TIP, offset(40, 90)),
            ]
        } else if self.input.point {
            let (middle, pinky) = match self.ui_finger {
                UiFinger::Middle => (c, offset(40, 30)),
                UiFinger::Pinky => (offset(-30, 0), c),
            };
            [
                (landmarks::INDEX_FINGER_TIP, offset(-25, 5)),
                (landmarks::MIDDLE_FINGER_MCP, middle + Point::new(0, 70)),
                (landmarks::MIDDLE_FINGER_TIP, middle),
                (landmarks::PINKY_TIP, pinky),
            ]
        } else {
            return None;
        };

        Some(Hand {
            keypoints: points.iter().map(|&(id, point)| Keypoint { id, point }).collect(),
        })
    }
}

impl Perceiver for SimulatedPerceiver {
    fn detect(&mut self, _frame: &FrameBuffer) -> Result<Perception> {
        let Some(c) = self.input.cursor else {
            return Ok(Perception::default());
        };

        let hands = self.hand_at(c).into_iter().collect();
        let faces = if self.input.face {
            let half = SIM_FACE_SIZE / 2;
            vec![FaceDetection::from_bbox(BoundingBox::new(
                c.x - half,
                c.y - half,
                SIM_FACE_SIZE,
                SIM_FACE_SIZE,
            ))]
        } else {
            Vec::new()
        };

        Ok(Perception { hands, faces })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::gesture::FingerPositions;

    fn settings() -> DetectorSettings {
        DetectorSettings::from_config(&Config::default())
    }

    #[test]
    fn parses_normalized_coordinates_to_pixels() {
        let line = r#"{"hands":[{"score":0.9,"landmarks":[{"x":0.5,"y":0.25},{"x":0.999,"y":0.0}]}],
                      "faces":[{"score":0.8,"bbox":[0.25,0.5,0.5,0.25]}]}"#
            .replace('\n', "");
        let p = parse_detections(&line, 640, 480, &settings()).unwrap();
        assert_eq!(p.hands.len(), 1);
        assert_eq!(p.hands[0].keypoint(0), Some(Point::new(320, 120)));
        assert_eq!(p.hands[0].keypoint(1), Some(Point::new(639, 0)));
        assert_eq!(p.faces[0].bbox, BoundingBox::new(160, 240, 320, 120));
        assert_eq!(p.faces[0].center, Point::new(320, 300));
    }

    #[test]
    fn drops_low_confidence_and_extra_hands() {
        let line = r#"{"hands":[{"score":0.2,"landmarks":[]},{"score":0.9,"landmarks":[{"x":0.1,"y":0.1}]},{"score":0.95,"landmarks":[]}],"faces":[{"score":0.1,"bbox":[0,0,1,1]}]}"#;
        let p = parse_detections(line, 100, 100, &settings()).unwrap();
        assert_eq!(p.hands.len(), 1);
        assert_eq!(p.hands[0].keypoint(0), Some(Point::new(10, 10)));
        assert!(p.faces.is_empty());
    }

    #[test]
    fn detector_error_is_an_empty_frame() {
        let p = parse_detections(r#"{"error":"model hiccup"}"#, 100, 100, &settings()).unwrap();
        assert_eq!(p, Perception::default());
    }

    #[test]
    fn malformed_line_is_an_error() {
        assert!(matches!(
            parse_detections("not json", 10, 10, &settings()),
            Err(Error::Json(_))
        ));
    }

    // Shell stand-in for the helper; spawn appends the threshold flags as
    // positional parameters, which the script ignores.
    #[cfg(unix)]
    fn shell_helper(script: &str) -> Vec<String> {
        vec!["sh".into(), "-c".into(), script.into(), "helper".into()]
    }

    // 12-byte header plus 10 * 10 * 3 bytes of RGB.
    #[cfg(unix)]
    const TEN_BY_TEN_REQUEST: usize = 12 + 300;

    #[cfg(unix)]
    #[test]
    fn subprocess_round_trip_and_eof() {
        let script = format!(
            "echo READY; head -c {n} >/dev/null; \
             echo '{{\"hands\":[{{\"score\":0.9,\"landmarks\":[{{\"x\":0.5,\"y\":0.2}}]}}],\"faces\":[{{\"score\":0.9,\"bbox\":[0.1,0.1,0.5,0.5]}}]}}'; \
             head -c {n} >/dev/null",
            n = TEN_BY_TEN_REQUEST
        );
        let mut detector = SubprocessPerceiver::spawn(&shell_helper(&script), settings()).unwrap();
        let frame = FrameBuffer::new(10, 10);

        let p = detector.detect(&frame).unwrap();
        assert_eq!(p.hands[0].keypoint(0), Some(Point::new(5, 2)));
        assert_eq!(p.faces[0].bbox, BoundingBox::new(1, 1, 5, 5));
        assert_eq!(p.faces[0].center, Point::new(3, 3));

        // The helper reads the second frame and exits without answering.
        assert!(matches!(detector.detect(&frame), Err(Error::Perception(_))));
    }

    #[cfg(unix)]
    #[test]
    fn subprocess_without_ready_line_fails_to_spawn() {
        let result = SubprocessPerceiver::spawn(&shell_helper("echo LOADING"), settings());
        assert!(matches!(result, Err(Error::Perception(_))));
    }

    #[test]
    fn empty_detector_command_is_rejected() {
        assert!(matches!(SubprocessPerceiver::spawn(&[], settings()), Err(Error::Perception(_))));
    }

    #[test]
    fn simulated_draw_posture_enables_drawing_at_cursor() {
        let mut sim = SimulatedPerceiver::new(UiFinger::Middle);
        sim.set_input(SimInput { cursor: Some(Point::new(200, 200)), draw: true, ..Default::default() });
        let p = sim.detect(&FrameBuffer::new(1, 1)).unwrap();
        let f = FingerPositions::from_hand(&p.hands[0]);
        assert!(f.drawing_enabled());
        assert_eq!(f.index_tip, Some(Point::new(200, 200)));
        assert!(p.faces.is_empty());
    }

    #[test]
    fn simulated_point_posture_pauses_and_aims_ui_finger() {
        let mut sim = SimulatedPerceiver::new(UiFinger::Pinky);
        sim.set_input(SimInput { cursor: Some(Point::new(50, 60)), point: true, face: true, ..Default::default() });
        let p = sim.detect(&FrameBuffer::new(1, 1)).unwrap();
        let f = FingerPositions::from_hand(&p.hands[0]);
        assert!(!f.drawing_enabled());
        assert_eq!(f.ui_pointer(UiFinger::Pinky), Some(Point::new(50, 60)));
        assert_eq!(p.faces[0].center, Point::new(50, 60));
    }

    #[test]
    fn simulated_idle_mouse_means_no_hand() {
        let mut sim = SimulatedPerceiver::new(UiFinger::Middle);
        sim.set_input(SimInput { cursor: Some(Point::new(5, 5)), ..Default::default() });
        assert!(sim.detect(&FrameBuffer::new(1, 1)).unwrap().hands.is_empty());
    }
}
