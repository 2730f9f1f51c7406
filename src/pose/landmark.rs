use nalgebra::Vector3;
use serde::{Deserialize, Serialize};

/// 17 ランドマークの識別子（COCO 順）
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
#[repr(usize)]
pub enum LandmarkId {
    Nose = 0,
    LeftEye = 1,
    RightEye = 2,
    LeftEar = 3,
    RightEar = 4,
    LeftShoulder = 5,
    RightShoulder = 6,
    LeftElbow = 7,
    RightElbow = 8,
    LeftWrist = 9,
    RightWrist = 10,
    LeftHip = 11,
    RightHip = 12,
    LeftKnee = 13,
    RightKnee = 14,
    LeftAnkle = 15,
    RightAnkle = 16,
}

impl LandmarkId {
    pub const COUNT: usize = 17;

    pub const ALL: [LandmarkId; LandmarkId::COUNT] = [
        Self::Nose,
        Self::LeftEye,
        Self::RightEye,
        Self::LeftEar,
        Self::RightEar,
        Self::LeftShoulder,
        Self::RightShoulder,
        Self::LeftElbow,
        Self::RightElbow,
        Self::LeftWrist,
        Self::RightWrist,
        Self::LeftHip,
        Self::RightHip,
        Self::LeftKnee,
        Self::RightKnee,
        Self::LeftAnkle,
        Self::RightAnkle,
    ];

    pub fn from_index(index: usize) -> Option<Self> {
        Self::ALL.get(index).copied()
    }

    /// 入力 JSON で使う名前
    pub fn name(&self) -> &'static str {
        match self {
            Self::Nose => "nose",
            Self::LeftEye => "left_eye",
            Self::RightEye => "right_eye",
            Self::LeftEar => "left_ear",
            Self::RightEar => "right_ear",
            Self::LeftShoulder => "left_shoulder",
            Self::RightShoulder => "right_shoulder",
            Self::LeftElbow => "left_elbow",
            Self::RightElbow => "right_elbow",
            Self::LeftWrist => "left_wrist",
            Self::RightWrist => "right_wrist",
            Self::LeftHip => "left_hip",
            Self::RightHip => "right_hip",
            Self::LeftKnee => "left_knee",
            Self::RightKnee => "right_knee",
            Self::LeftAnkle => "left_ankle",
            Self::RightAnkle => "right_ankle",
        }
    }

    pub fn from_name(name: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|id| id.name() == name)
    }
}

/// 単一ランドマーク
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Landmark {
    pub x: f32,
    pub y: f32,
    /// 相対奥行き（カメラに近いほど小さい）
    #[serde(default)]
    pub z: f32,
    /// 可視度 (0.0〜1.0)
    pub visibility: f32,
}

impl Landmark {
    pub fn new(x: f32, y: f32, z: f32, visibility: f32) -> Self {
        Self { x, y, z, visibility }
    }

    /// 可視度が閾値以上か
    pub fn is_valid(&self, threshold: f32) -> bool {
        self.visibility >= threshold
    }

    pub fn position(&self) -> Vector3<f32> {
        Vector3::new(self.x, self.y, self.z)
    }

    /// t (0.0..=1.0) で b へ線形補間。可視度は低い方を採用
    pub fn lerp(&self, b: &Landmark, t: f32) -> Landmark {
        let t = t.clamp(0.0, 1.0);
        Landmark {
            x: (1.0 - t) * self.x + t * b.x,
            y: (1.0 - t) * self.y + t * b.y,
            z: (1.0 - t) * self.z + t * b.z,
            visibility: self.visibility.min(b.visibility),
        }
    }
}

impl Default for Landmark {
    fn default() -> Self {
        Self {
            x: 0.0,
            y: 0.0,
            z: 0.0,
            visibility: 0.0,
        }
    }
}

/// 17 ランドマークからなる姿勢
#[derive(Debug, Clone, PartialEq)]
pub struct Pose {
    pub landmarks: [Landmark; LandmarkId::COUNT],
}

impl Pose {
    pub fn new(landmarks: [Landmark; LandmarkId::COUNT]) -> Self {
        Self { landmarks }
    }

    pub fn get(&self, id: LandmarkId) -> &Landmark {
        &self.landmarks[id as usize]
    }

    pub fn set(&mut self, id: LandmarkId, landmark: Landmark) {
        self.landmarks[id as usize] = landmark;
    }

    /// 両方が有効なときだけ中点を返す
    pub fn midpoint(&self, a: LandmarkId, b: LandmarkId, threshold: f32) -> Option<Vector3<f32>> {
        let la = self.get(a);
        let lb = self.get(b);
        if !la.is_valid(threshold) || !lb.is_valid(threshold) {
            return None;
        }
        Some((la.position() + lb.position()) / 2.0)
    }

    /// a → b のベクトル（どちらかが無効なら None）
    pub fn segment(&self, a: LandmarkId, b: LandmarkId, threshold: f32) -> Option<Vector3<f32>> {
        let la = self.get(a);
        let lb = self.get(b);
        if !la.is_valid(threshold) || !lb.is_valid(threshold) {
            return None;
        }
        Some(lb.position() - la.position())
    }

    /// 指定ランドマークのうち閾値未満のもの
    pub fn first_invalid(&self, ids: &[LandmarkId], threshold: f32) -> Option<LandmarkId> {
        ids.iter().copied().find(|&id| !self.get(id).is_valid(threshold))
    }

    /// 全ランドマークを補間
    pub fn lerp(&self, b: &Pose, t: f32) -> Pose {
        let landmarks = std::array::from_fn(|i| self.landmarks[i].lerp(&b.landmarks[i], t));
        Pose { landmarks }
    }
}

impl Default for Pose {
    fn default() -> Self {
        Self {
            landmarks: [Landmark::default(); LandmarkId::COUNT],
        }
    }
}
