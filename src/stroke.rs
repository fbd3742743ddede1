// Stroke & face-follow engine.
//
// Owns every drawn [`Segment`] and the canvas rendered from them. The canvas
// is never drawn into directly: each mutation re-rasterizes it from the
// segment list, which is what makes moving segments after the fact possible.
//
// ## Face following
//
// A session-wide [`FaceFollowMode`] decides whether a *new* stroke starts out
// face-following. The decision that sticks is made when the stroke ends: if
// its last point lies inside any face detected this frame, the mode becomes
// `Following` and the closed segment is tagged to follow; otherwise the mode
// becomes `Still` and the segment stays put. Once closed, a segment's tag no
// longer changes.
//
// Tagged segments are translated by the frame-to-frame movement of the
// primary face centre in [`StrokeEngine::apply_face_movement`].

use crate::render;
use crate::types::{FaceDetection, FrameBuffer, Point, Rgb};
use log::{debug, info};
use std::collections::BTreeSet;
use std::fmt;

/// One continuous stroke.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Segment {
    pub points: Vec<Point>,
    pub color: Rgb,
    pub thickness: u32,
    pub follows_face: bool,
}

impl Segment {
    fn translate(&mut self, delta: Point) {
        for p in &mut self.points {
            *p += delta;
        }
    }
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum FaceFollowMode {
    #[default]
    Still,
    Following,
}

impl FaceFollowMode {
    pub const fn is_following(self) -> bool {
        matches!(self, FaceFollowMode::Following)
    }
}

impl fmt::Display for FaceFollowMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FaceFollowMode::Still => write!(f, "STILL"),
            FaceFollowMode::Following => write!(f, "FOLLOWING"),
        }
    }
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum StrokeState {
    #[default]
    Idle,
    /// The open stroke is always the last segment.
    Drawing,
}

/// What `stop` decided, for callers that want to react.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct StrokeEnd {
    pub segment: usize,
    pub follows_face: bool,
    /// Some(new mode) if the mode changed.
    pub mode_change: Option<FaceFollowMode>,
}

pub struct StrokeEngine {
    segments: Vec<Segment>,
    following: BTreeSet<usize>,
    mode: FaceFollowMode,
    state: StrokeState,
    // Primary face centre from the last `apply_face_movement`; None after a reset.
    last_face_center: Option<Point>,
    // Faces for the current frame only; replaced by `update_faces` every tick.
    faces: Vec<FaceDetection>,
    canvas: FrameBuffer,
}

impl StrokeEngine {
    pub fn new(width: usize, height: usize) -> Self {
        Self {
            segments: Vec::new(),
            following: BTreeSet::new(),
            mode: FaceFollowMode::Still,
            state: StrokeState::Idle,
            last_face_center: None,
            faces: Vec::new(),
            canvas: FrameBuffer::new(width, height),
        }
    }

    pub fn segments(&self) -> &[Segment] {
        &self.segments
    }

    pub fn segment_count(&self) -> usize {
        self.segments.len()
    }

    pub fn mode(&self) -> FaceFollowMode {
        self.mode
    }

    pub fn state(&self) -> StrokeState {
        self.state
    }

    pub fn is_drawing(&self) -> bool {
        self.state == StrokeState::Drawing
    }

    /// Indices of closed segments that move with the face.
    pub fn following(&self) -> impl Iterator<Item = usize> + '_ {
        self.following.iter().copied()
    }

    pub fn faces(&self) -> &[FaceDetection] {
        &self.faces
    }

    pub fn canvas(&self) -> &FrameBuffer {
        &self.canvas
    }

    /// Replace the face snapshot. Must run before any stroke decision in a frame.
    pub fn update_faces(&mut self, faces: &[FaceDetection]) {
        self.faces.clear();
        self.faces.extend_from_slice(faces);
    }

    /// Open a new stroke at `point`. An already open stroke is closed first.
    pub fn start(&mut self, point: Point, color: Rgb, thickness: u32) {
        if self.is_drawing() {
            self.stop(None);
        }
        self.segments.push(Segment {
            points: vec![point],
            color,
            thickness,
            follows_face: self.mode.is_following(),
        });
        self.state = StrokeState::Drawing;
    }

    /// Extend the open stroke. Does nothing while idle.
    pub fn continue_stroke(&mut self, point: Point) {
        if !self.is_drawing() {
            return;
        }
        if let Some(seg) = self.segments.last_mut() {
            seg.points.push(point);
            self.redraw();
        }
    }

    /// Close the open stroke and settle its face-follow tag.
    ///
    /// `end_point` is only used for the face test; it is not appended. With
    /// `None` the stroke's own last point is used. Idle → no-op.
    pub fn stop(&mut self, end_point: Option<Point>) -> Option<StrokeEnd> {
        if !self.is_drawing() {
            return None;
        }
        self.state = StrokeState::Idle;

        let index = self.segments.len().checked_sub(1)?;
        let terminal = end_point.or_else(|| self.segments[index].points.last().copied())?;

        let face_detected = self.faces.iter().any(|f| f.bbox.contains(terminal));
        let new_mode = if face_detected { FaceFollowMode::Following } else { FaceFollowMode::Still };

        let mode_change = if new_mode != self.mode {
            info!("Face follow mode: {} -> {}", self.mode, new_mode);
            self.mode = new_mode;
            Some(new_mode)
        } else {
            None
        };

        let follows = new_mode.is_following();
        self.segments[index].follows_face = follows;
        if follows {
            self.following.insert(index);
        } else {
            self.following.remove(&index);
        }

        Some(StrokeEnd { segment: index, follows_face: follows, mode_change })
    }

    /// Move every face-following segment by how far the face moved since the
    /// last call. The first call after a reset only records the baseline.
    pub fn apply_face_movement(&mut self, center: Point) {
        let Some(last) = self.last_face_center.replace(center) else {
            return;
        };

        let delta = center - last;
        if delta.is_zero() || self.following.is_empty() {
            return;
        }

        debug!("Face moved by ({}, {}); shifting {} segment(s)", delta.x, delta.y, self.following.len());
        for &i in &self.following {
            // Indices are dropped wholesale on clear; skip anything stale.
            if let Some(seg) = self.segments.get_mut(i) {
                seg.translate(delta);
            }
        }
        self.redraw();
    }

    /// Re-rasterize the canvas from the segment list.
    pub fn render(&mut self) -> &FrameBuffer {
        self.redraw();
        &self.canvas
    }

    /// Drop every segment and return to a fresh session.
    pub fn clear(&mut self) {
        self.segments.clear();
        self.following.clear();
        self.mode = FaceFollowMode::Still;
        self.state = StrokeState::Idle;
        self.last_face_center = None;
        self.redraw();
    }

    fn redraw(&mut self) {
        render::render_into(&mut self.canvas, &self.segments);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::BoundingBox;

    const YELLOW: Rgb = Rgb::new(255, 255, 0);

    fn face(x: i32, y: i32, w: i32, h: i32) -> FaceDetection {
        FaceDetection::from_bbox(BoundingBox::new(x, y, w, h))
    }

    fn p(x: i32, y: i32) -> Point {
        Point::new(x, y)
    }

    fn stroke(engine: &mut StrokeEngine, points: &[(i32, i32)]) {
        engine.start(p(points[0].0, points[0].1), YELLOW, 4);
        for &(x, y) in &points[1..] {
            engine.continue_stroke(p(x, y));
        }
    }

    #[test]
    fn start_continue_stop_cycle() {
        let mut e = StrokeEngine::new(100, 100);
        assert_eq!(e.state(), StrokeState::Idle);
        stroke(&mut e, &[(1, 1), (5, 5), (9, 1)]);
        assert!(e.is_drawing());
        assert_eq!(e.segments()[0].points, vec![p(1, 1), p(5, 5), p(9, 1)]);
        assert!(e.stop(None).is_some());
        assert_eq!(e.state(), StrokeState::Idle);
        assert_eq!(e.segment_count(), 1);
    }

    #[test]
    fn continue_while_idle_is_a_no_op() {
        let mut e = StrokeEngine::new(100, 100);
        e.continue_stroke(p(3, 3));
        assert_eq!(e.segment_count(), 0);
        assert!(e.stop(None).is_none());
    }

    #[test]
    fn stop_twice_is_safe() {
        let mut e = StrokeEngine::new(100, 100);
        stroke(&mut e, &[(1, 1), (2, 2)]);
        assert!(e.stop(None).is_some());
        assert!(e.stop(None).is_none());
        assert_eq!(e.segment_count(), 1);
    }

    #[test]
    fn stop_does_not_add_points() {
        let mut e = StrokeEngine::new(100, 100);
        stroke(&mut e, &[(10, 10), (20, 20)]);
        e.stop(None);
        assert_eq!(e.segments()[0].points, vec![p(10, 10), p(20, 20)]);

        stroke(&mut e, &[(30, 30), (40, 40)]);
        e.stop(Some(p(90, 90)));
        assert_eq!(e.segments()[1].points, vec![p(30, 30), p(40, 40)]);
    }

    #[test]
    fn follow_tag_is_decided_at_stroke_end() {
        let mut e = StrokeEngine::new(200, 200);
        e.update_faces(&[face(50, 50, 40, 40)]);

        // Starts under STILL, outside the face, ends inside it.
        stroke(&mut e, &[(0, 0), (60, 60)]);
        assert!(!e.segments()[0].follows_face);
        let end = e.stop(None).unwrap();

        assert!(end.follows_face);
        assert_eq!(end.mode_change, Some(FaceFollowMode::Following));
        assert!(e.segments()[0].follows_face);
        assert_eq!(e.mode(), FaceFollowMode::Following);
        assert_eq!(e.following().collect::<Vec<_>>(), vec![0]);
    }

    #[test]
    fn stroke_started_while_following_but_ended_away_stays_still() {
        let mut e = StrokeEngine::new(200, 200);
        e.update_faces(&[face(50, 50, 40, 40)]);
        stroke(&mut e, &[(60, 60), (70, 70)]);
        e.stop(None);

        // New stroke begins tagged (mode is FOLLOWING) ...
        stroke(&mut e, &[(70, 70), (150, 150)]);
        assert!(e.segments()[1].follows_face);
        // ... but ends off the face, so it is untagged and the mode flips back.
        let end = e.stop(None).unwrap();
        assert!(!end.follows_face);
        assert_eq!(end.mode_change, Some(FaceFollowMode::Still));
        assert!(!e.segments()[1].follows_face);
        assert_eq!(e.following().collect::<Vec<_>>(), vec![0]);

        // The earlier segment keeps its tag.
        assert!(e.segments()[0].follows_face);
    }

    #[test]
    fn explicit_end_point_drives_face_test() {
        let mut e = StrokeEngine::new(200, 200);
        e.update_faces(&[face(100, 100, 20, 20)]);
        stroke(&mut e, &[(0, 0), (10, 10)]);
        let end = e.stop(Some(p(120, 120))).unwrap();
        assert!(end.follows_face);
    }

    #[test]
    fn any_face_counts_and_unchanged_mode_reports_nothing() {
        let mut e = StrokeEngine::new(300, 300);
        e.update_faces(&[face(0, 0, 10, 10), face(200, 200, 50, 50)]);
        stroke(&mut e, &[(1, 1), (250, 250)]);
        assert_eq!(e.stop(None).unwrap().mode_change, Some(FaceFollowMode::Following));
        stroke(&mut e, &[(1, 1), (5, 5)]);
        assert_eq!(e.stop(None).unwrap().mode_change, None);
    }

    #[test]
    fn starting_while_drawing_closes_the_open_stroke() {
        let mut e = StrokeEngine::new(100, 100);
        stroke(&mut e, &[(1, 1), (2, 2)]);
        e.start(p(50, 50), YELLOW, 2);
        assert_eq!(e.segment_count(), 2);
        assert_eq!(e.segments()[0].points.len(), 2);
        assert!(e.is_drawing());
    }

    #[test]
    fn first_face_call_only_records_baseline() {
        let mut e = StrokeEngine::new(200, 200);
        e.update_faces(&[face(40, 40, 40, 40)]);
        stroke(&mut e, &[(50, 50), (60, 60)]);
        e.stop(None);
        assert_eq!(e.following().count(), 1);

        e.apply_face_movement(p(60, 60));
        assert_eq!(e.segments()[0].points, vec![p(50, 50), p(60, 60)]);

        e.apply_face_movement(p(65, 58));
        assert_eq!(e.segments()[0].points, vec![p(55, 48), p(65, 58)]);
    }

    #[test]
    fn baseline_is_forgotten_after_clear() {
        let mut e = StrokeEngine::new(200, 200);
        e.apply_face_movement(p(10, 10));
        e.clear();

        e.update_faces(&[face(0, 0, 100, 100)]);
        stroke(&mut e, &[(20, 20), (30, 30)]);
        e.stop(None);
        assert!(e.segments()[0].follows_face);

        // First call after clear: no jump from the pre-clear centre.
        e.apply_face_movement(p(90, 90));
        assert_eq!(e.segments()[0].points, vec![p(20, 20), p(30, 30)]);
    }

    #[test]
    fn movement_leaves_still_segments_alone() {
        let mut e = StrokeEngine::new(300, 300);
        e.update_faces(&[face(100, 100, 50, 50)]);
        stroke(&mut e, &[(0, 0), (10, 10)]);
        e.stop(None);
        stroke(&mut e, &[(110, 110), (120, 120)]);
        e.stop(None);
        stroke(&mut e, &[(200, 200), (210, 210)]);
        e.stop(None);

        e.apply_face_movement(p(125, 125));
        e.apply_face_movement(p(135, 120));

        assert_eq!(e.segments()[0].points, vec![p(0, 0), p(10, 10)]);
        assert_eq!(e.segments()[1].points, vec![p(120, 105), p(130, 115)]);
        assert_eq!(e.segments()[2].points, vec![p(200, 200), p(210, 210)]);
    }

    #[test]
    fn open_stroke_is_not_moved() {
        let mut e = StrokeEngine::new(300, 300);
        e.update_faces(&[face(0, 0, 300, 300)]);
        stroke(&mut e, &[(10, 10), (20, 20)]);
        e.stop(None);
        stroke(&mut e, &[(50, 50), (60, 60)]);

        e.apply_face_movement(p(100, 100));
        e.apply_face_movement(p(110, 100));

        assert_eq!(e.segments()[0].points, vec![p(20, 10), p(30, 20)]);
        assert_eq!(e.segments()[1].points, vec![p(50, 50), p(60, 60)]);
    }

    #[test]
    fn canvas_tracks_segments_after_every_mutation() {
        let mut e = StrokeEngine::new(120, 120);
        e.update_faces(&[face(0, 0, 120, 120)]);
        stroke(&mut e, &[(10, 10), (40, 10)]);
        assert_eq!(e.canvas(), &render::render(e.segments(), 120, 120));
        e.stop(None);

        e.apply_face_movement(p(60, 60));
        e.apply_face_movement(p(60, 80));
        assert_eq!(e.canvas(), &render::render(e.segments(), 120, 120));
        assert_eq!(render::rgb_at(e.canvas(), p(25, 30)), Some(YELLOW));
        assert_eq!(render::rgb_at(e.canvas(), p(25, 10)), Some(Rgb::BLACK));
    }

    #[test]
    fn clear_resets_everything() {
        let mut e = StrokeEngine::new(200, 200);
        e.update_faces(&[face(50, 50, 50, 50)]);
        stroke(&mut e, &[(0, 0), (10, 10)]);
        e.stop(None);
        stroke(&mut e, &[(60, 60), (70, 70)]);
        e.stop(None);
        stroke(&mut e, &[(150, 150), (160, 160)]);
        // Third stroke left open.

        e.clear();
        assert_eq!(e.segment_count(), 0);
        assert_eq!(e.following().count(), 0);
        assert_eq!(e.mode(), FaceFollowMode::Still);
        assert_eq!(e.state(), StrokeState::Idle);
        assert!(e.canvas().is_blank());

        e.apply_face_movement(p(10, 10));
        e.apply_face_movement(p(90, 90));
        assert!(e.render().is_blank());
    }

    #[test]
    fn clear_is_safe_in_any_state() {
        let mut e = StrokeEngine::new(10, 10);
        e.clear();
        e.start(p(1, 1), YELLOW, 1);
        e.clear();
        e.clear();
        assert_eq!(e.segment_count(), 0);
    }
}
