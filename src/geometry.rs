//! 関節角度と偏差の幾何プリミティブ
//!
//! 座標は正規化画像平面 (0.0〜1.0) を前提とする。遮蔽やノイズで
//! ランドマークが退化してもフレームループを止めないため、零長
//! ベクトルは固定の 90.0° フォールバックで処理する。

use crate::pose::Landmark;

/// 退化入力（零長レイ）のフォールバック角度
pub const DEGENERATE_ANGLE: f32 = 90.0;

/// 頂点 b における ∠abc を度で返す。
///
/// 正規化内積のコサインを逆余弦の前に [-1, 1] へクランプする
/// （浮動小数の丸めによる定義域エラー対策）。
/// いずれかのレイが零長なら `DEGENERATE_ANGLE` を返す。
pub fn angle(a: &Landmark, b: &Landmark, c: &Landmark) -> f32 {
    let (v1x, v1y) = (a.x - b.x, a.y - b.y);
    let (v2x, v2y) = (c.x - b.x, c.y - b.y);
    let n1 = (v1x * v1x + v1y * v1y).sqrt();
    let n2 = (v2x * v2x + v2y * v2y).sqrt();
    if n1 <= f32::EPSILON || n2 <= f32::EPSILON {
        return DEGENERATE_ANGLE;
    }
    let cos = ((v1x * v2x + v1y * v2y) / (n1 * n2)).clamp(-1.0, 1.0);
    cos.acos().to_degrees()
}

/// 3点の直線度からの偏差（度）。一直線で 0。
pub fn straightness_deviation(a: &Landmark, b: &Landmark, c: &Landmark) -> f32 {
    180.0 - angle(a, b, c)
}

/// a→b セグメントの鉛直からの偏差（度）。真下方向で 0。
pub fn vertical_deviation(a: &Landmark, b: &Landmark) -> f32 {
    let dx = (b.x - a.x).abs();
    let dy = (b.y - a.y).abs();
    if dx <= f32::EPSILON && dy <= f32::EPSILON {
        return 0.0;
    }
    f32::atan2(dx, dy).to_degrees()
}

/// hip→shoulder の水平からの傾き（度）。仰臥位で 0 付近、直立で 90 付近。
pub fn torso_inclination(hip: &Landmark, shoulder: &Landmark) -> f32 {
    let dx = (shoulder.x - hip.x).abs();
    let dy = (shoulder.y - hip.y).abs();
    if dx <= f32::EPSILON && dy <= f32::EPSILON {
        return 0.0;
    }
    f32::atan2(dy, dx).to_degrees()
}

/// 点 p の、a→b を通る直線からの符号付き法線オフセット（正規化座標）。
/// 画像座標系（y 下向き）で、直線より下側にある点が正。
pub fn line_offset(p: &Landmark, a: &Landmark, b: &Landmark) -> f32 {
    // 向きに依存しないよう、x の小さい側を始点に揃える
    let (a, b) = if b.x >= a.x { (a, b) } else { (b, a) };
    let abx = b.x - a.x;
    let aby = b.y - a.y;
    let len = (abx * abx + aby * aby).sqrt();
    if len <= f32::EPSILON {
        return 0.0;
    }
    ((p.y - a.y) * abx - (p.x - a.x) * aby) / len
}

/// 2点の中点。可視性は低い方を引き継ぐ。
pub fn midpoint(a: &Landmark, b: &Landmark) -> Landmark {
    Landmark::new(
        (a.x + b.x) / 2.0,
        (a.y + b.y) / 2.0,
        (a.z + b.z) / 2.0,
        a.visibility.min(b.visibility),
    )
}
