//! テスト用の合成スイング（正面撮影、右打ち）
//!
//! 正規化座標（腰中点原点・肩幅単位・y 上向き）で姿勢を作り、
//! IMAGE_ORIGIN / IMAGE_SCALE で画像座標に戻す。

use nalgebra::Vector3;

use crate::pose::{Frame, Landmark, LandmarkId, Pose, PoseSequence};

pub const FRAME_COUNT: usize = 70;
pub const FPS: f32 = 30.0;
pub const IMAGE_ORIGIN: [f32; 3] = [0.5, 0.6, 0.0];
pub const IMAGE_SCALE: f32 = 0.16;

pub const TOP_FRAME: usize = 25;
pub const IMPACT_FRAME: usize = 40;

const VISIBILITY: f32 = 0.95;

/// 手首速度の設計値（肩幅/秒）
pub fn speed_profile(i: usize) -> f32 {
    let f = i as f32;
    match i {
        0..=10 => 0.0,
        11..=15 => 0.8 * (f - 10.0),
        16..=25 => 4.0 - 0.3 * (f - 15.0),
        26..=40 => 1.0 + 14.0 / 15.0 * (f - 25.0),
        41..=52 => 15.0 - 1.25 * (f - 40.0),
        _ => 0.0,
    }
}

fn lerp_keyframes(i: usize, keys: &[(usize, f32)]) -> f32 {
    if i <= keys[0].0 {
        return keys[0].1;
    }
    for w in keys.windows(2) {
        let (i0, v0) = w[0];
        let (i1, v1) = w[1];
        if i <= i1 {
            let t = (i - i0) as f32 / (i1 - i0) as f32;
            return v0 + (v1 - v0) * t;
        }
    }
    keys[keys.len() - 1].1
}

/// 水平面での肩の回転（度）
fn shoulder_turn_deg(i: usize) -> f32 {
    lerp_keyframes(i, &[(10, 0.0), (25, 60.0), (40, 0.0), (52, -45.0)])
}

/// 画像面での肩の傾き（度）
fn shoulder_tilt_deg(i: usize) -> f32 {
    lerp_keyframes(i, &[(10, 0.0), (25, 15.0), (40, 0.0), (52, -10.0)])
}

fn backswing_dir() -> Vector3<f32> {
    Vector3::new(-0.6, 0.8, 0.0)
}

/// 水平成分が目標方向から path_deg だけ外側（正）／内側（負）を向く
fn downswing_dir(path_deg: f32) -> Vector3<f32> {
    let (s, c) = path_deg.to_radians().sin_cos();
    Vector3::new(0.6 * c, -0.8, -0.6 * s)
}

/// 手首中点の軌跡（正規化座標）
fn wrist_path(path_deg: f32) -> Vec<Vector3<f32>> {
    let mut points = vec![Vector3::new(0.0, 0.4, -0.3)];
    for i in 1..FRAME_COUNT {
        let step = (speed_profile(i - 1) + speed_profile(i)) / 2.0 / FPS;
        let dir = if i <= TOP_FRAME {
            backswing_dir()
        } else {
            downswing_dir(path_deg)
        };
        let prev = points[i - 1];
        points.push(prev + dir * step);
    }
    points
}

fn to_image(p: Vector3<f32>) -> Landmark {
    Landmark::new(
        IMAGE_ORIGIN[0] + p.x * IMAGE_SCALE,
        IMAGE_ORIGIN[1] - p.y * IMAGE_SCALE,
        IMAGE_ORIGIN[2] + p.z * IMAGE_SCALE,
        VISIBILITY,
    )
}

fn pose_at(i: usize, wrist: Vector3<f32>) -> Pose {
    use LandmarkId::*;
    let mut pose = Pose::default();
    let mut put = |id: LandmarkId, x: f32, y: f32, z: f32| {
        pose.set(id, to_image(Vector3::new(x, y, z)));
    };

    put(Nose, 0.0, 2.1, -0.1);
    put(LeftEye, 0.08, 2.2, -0.1);
    put(RightEye, -0.08, 2.2, -0.1);
    put(LeftEar, 0.15, 2.15, 0.0);
    put(RightEar, -0.15, 2.15, 0.0);
    put(LeftElbow, 0.3, 1.0, -0.15);
    put(RightElbow, -0.3, 1.0, -0.15);
    put(LeftHip, 0.35, 0.0, 0.0);
    put(RightHip, -0.35, 0.0, 0.0);
    put(LeftKnee, 0.3, -1.2, 0.0);
    put(RightKnee, -0.3, -1.2, 0.0);
    put(LeftAnkle, 0.35, -2.4, 0.0);
    put(RightAnkle, -0.35, -2.4, 0.0);

    // 右肩 → 左肩ベクトル = (cosφ cosα, sinα, -sinφ)
    let phi = shoulder_turn_deg(i).to_radians();
    let alpha = shoulder_tilt_deg(i).to_radians();
    let half = Vector3::new(phi.cos() * alpha.cos(), alpha.sin(), -phi.sin()) * 0.5;
    let center = Vector3::new(0.0, 1.6, 0.0);
    let left = center + half;
    let right = center - half;
    put(LeftShoulder, left.x, left.y, left.z);
    put(RightShoulder, right.x, right.y, right.z);

    let grip = Vector3::new(0.03, 0.0, 0.0);
    let lw = wrist + grip;
    let rw = wrist - grip;
    put(LeftWrist, lw.x, lw.y, lw.z);
    put(RightWrist, rw.x, rw.y, rw.z);

    pose
}

/// 70 フレーム、30fps の合成スイング
pub fn swing(path_deg: f32) -> PoseSequence {
    let frames = wrist_path(path_deg)
        .into_iter()
        .enumerate()
        .map(|(i, wrist)| Frame::new(i, pose_at(i, wrist)))
        .collect();
    PoseSequence::new(frames, FPS).unwrap()
}

/// 全ランドマークに変換をかけたシーケンス
pub fn map_landmarks(
    seq: &PoseSequence,
    f: impl Fn(LandmarkId, Landmark) -> Landmark,
) -> PoseSequence {
    let frames = seq
        .frames()
        .iter()
        .map(|frame| {
            let mut pose = frame.pose.clone();
            for id in LandmarkId::ALL {
                pose.set(id, f(id, *frame.pose.get(id)));
            }
            Frame::new(frame.index, pose)
        })
        .collect();
    PoseSequence::new(frames, seq.fps()).unwrap()
}

/// 条件に合うフレームの左手首と右肩の可視度を下げる
pub fn with_low_visibility(seq: &PoseSequence, hide: impl Fn(usize) -> bool) -> PoseSequence {
    let frames = seq
        .frames()
        .iter()
        .map(|frame| {
            let mut pose = frame.pose.clone();
            if hide(frame.index) {
                for id in [LandmarkId::LeftWrist, LandmarkId::RightShoulder] {
                    let lm = *pose.get(id);
                    pose.set(id, Landmark { visibility: 0.1, ..lm });
                }
            }
            Frame::new(frame.index, pose)
        })
        .collect();
    PoseSequence::new(frames, seq.fps()).unwrap()
}

/// 条件に合うフレームを入力から取り除く
pub fn drop_frames(seq: &PoseSequence, drop: impl Fn(usize) -> bool) -> PoseSequence {
    let frames = seq
        .frames()
        .iter()
        .filter(|frame| !drop(frame.index))
        .cloned()
        .collect();
    PoseSequence::new(frames, seq.fps()).unwrap()
}
