use std::path::Path;

/// 未绘制任何物体的像素标记
pub const NO_TAG: u32 = 0;

/// 逐像素的颜色（ARGB）、深度、物体标记和阴影覆盖
#[derive(Clone)]
pub struct FrameBuffer {
    pub width: usize,
    pub height: usize,
    pub data: Vec<u32>,
    pub depth: Vec<f32>,
    pub tags: Vec<u32>,
    shadow: Vec<bool>,
}

impl FrameBuffer {
    /// 深度范围为 [0, 1]，1 为远平面
    pub const FAR_DEPTH: f32 = 1.0;

    pub fn new(width: usize, height: usize) -> Self {
        let len = width * height;
        FrameBuffer {
            width,
            height,
            data: vec![0; len],
            depth: vec![Self::FAR_DEPTH; len],
            tags: vec![NO_TAG; len],
            shadow: vec![false; len],
        }
    }

    pub fn clear(&mut self, color: u32) {
        self.data.fill(color);
        self.depth.fill(Self::FAR_DEPTH);
        self.tags.fill(NO_TAG);
        self.shadow.fill(false);
    }

    fn index(&self, x: usize, y: usize) -> Option<usize> {
        (x < self.width && y < self.height).then(|| y * self.width + x)
    }

    /// 仅做深度测试，着色前提前剔除
    pub fn passes_depth(&self, x: usize, y: usize, depth: f32) -> bool {
        self.index(x, y).is_some_and(|idx| depth < self.depth[idx])
    }

    pub fn put_pixel(&mut self, x: usize, y: usize, color: u32, depth: f32, tag: u32) {
        if let Some(idx) = self.index(x, y) {
            if depth < self.depth[idx] {
                self.data[idx] = color;
                self.depth[idx] = depth;
                self.tags[idx] = tag;
            }
        }
    }

    pub fn tag_at(&self, x: usize, y: usize) -> u32 {
        self.index(x, y).map_or(NO_TAG, |idx| self.tags[idx])
    }

    /// 若接收面在 `depth` 处可见，则标记该像素处于阴影中
    pub fn mark_shadow(&mut self, x: usize, y: usize, depth: f32) {
        if let Some(idx) = self.index(x, y) {
            if depth < self.depth[idx] {
                self.shadow[idx] = true;
            }
        }
    }

    /// 每个被标记的像素只变暗一次，与投影物数量无关
    pub fn resolve_shadows(&mut self, opacity: f32) {
        let keep = (1.0 - opacity).clamp(0.0, 1.0);
        for (color, shadowed) in self.data.iter_mut().zip(self.shadow.iter_mut()) {
            if std::mem::take(shadowed) {
                *color = scale_rgb(*color, keep);
            }
        }
    }

    pub fn ssaa(&self, factor: usize) -> Self {
        let factor = factor.max(1);
        let new_width = self.width / factor;
        let new_height = self.height / factor;
        let mut new_data = vec![0; new_width * new_height];
        let mut new_tags = vec![NO_TAG; new_width * new_height];
        let count = (factor * factor) as u32;

        // 遍历缩小后的每个像素
        for y in 0..new_height {
            for x in 0..new_width {
                let mut channels = [0u32; 4];
                let mut tag = NO_TAG;

                // 采样高分辨率区域内的所有像素
                for dy in 0..factor {
                    for dx in 0..factor {
                        let src_idx = (y * factor + dy) * self.width + x * factor + dx;
                        let color = self.data[src_idx];
                        for (i, channel) in channels.iter_mut().enumerate() {
                            *channel += (color >> (24 - 8 * i)) & 0xFF;
                        }
                        if self.tags[src_idx] != NO_TAG {
                            tag = self.tags[src_idx];
                        }
                    }
                }

                // 计算平均值（包括背景色像素）
                let [a, r, g, b] = channels.map(|c| c / count);
                new_data[y * new_width + x] = a << 24 | r << 16 | g << 8 | b;
                new_tags[y * new_width + x] = tag;
            }
        }

        Self {
            width: new_width,
            height: new_height,
            data: new_data,
            depth: vec![Self::FAR_DEPTH; new_width * new_height],
            tags: new_tags,
            shadow: vec![false; new_width * new_height],
        }
    }

    pub fn save_to_image(&self, filepath: &Path) -> Result<(), image::ImageError> {
        use image::{ImageBuffer, Rgba};

        let img = ImageBuffer::from_fn(self.width as u32, self.height as u32, |x, y| {
            let color = self.data[y as usize * self.width + x as usize];
            let [a, r, g, b] = color.to_be_bytes();
            Rgba([r, g, b, a])
        });
        img.save(filepath)
    }
}

fn scale_rgb(color: u32, k: f32) -> u32 {
    let [a, r, g, b] = color.to_be_bytes();
    let s = |c: u8| (c as f32 * k).round() as u8;
    u32::from_be_bytes([a, s(r), s(g), s(b)])
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn nearer_pixels_win_and_keep_their_tag() {
        let mut fb = FrameBuffer::new(4, 4);
        fb.clear(0xFF000000);
        fb.put_pixel(1, 1, 0xFFFF0000, 0.5, 7);
        fb.put_pixel(1, 1, 0xFF00FF00, 0.8, 9);
        assert_eq!(fb.data[5], 0xFFFF0000);
        assert_eq!(fb.tag_at(1, 1), 7);
        assert_eq!(fb.tag_at(0, 0), NO_TAG);
        assert_eq!(fb.tag_at(10, 10), NO_TAG);
    }

    #[test]
    fn shadows_darken_each_pixel_once() {
        let mut fb = FrameBuffer::new(2, 1);
        fb.clear(0xFFC8C8C8);
        fb.mark_shadow(0, 0, 0.9);
        fb.mark_shadow(0, 0, 0.9);
        fb.resolve_shadows(0.5);
        assert_eq!(fb.data[0], 0xFF646464);
        assert_eq!(fb.data[1], 0xFFC8C8C8);
        // 第二次解析时已没有可变暗的像素
        fb.resolve_shadows(0.5);
        assert_eq!(fb.data[0], 0xFF646464);
    }

    #[test]
    fn occluded_receiver_is_not_shadowed() {
        let mut fb = FrameBuffer::new(1, 1);
        fb.clear(0xFFFFFFFF);
        fb.put_pixel(0, 0, 0xFF808080, 0.2, 1);
        fb.mark_shadow(0, 0, 0.7);
        fb.resolve_shadows(1.0);
        assert_eq!(fb.data[0], 0xFF808080);
    }

    #[test]
    fn ssaa_averages_blocks_and_keeps_tags() {
        let mut fb = FrameBuffer::new(2, 2);
        fb.clear(0xFF000000);
        fb.put_pixel(0, 0, 0xFFFFFFFF, 0.1, 3);
        let small = fb.ssaa(2);
        assert_eq!((small.width, small.height), (1, 1));
        assert_eq!(small.data[0], 0xFF3F3F3F);
        assert_eq!(small.tag_at(0, 0), 3);
    }

    #[test]
    fn saves_png() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("frame.png");
        let mut fb = FrameBuffer::new(3, 2);
        fb.clear(0xFF102030);
        fb.save_to_image(&path).unwrap();
        let img = image::open(&path).unwrap().to_rgba8();
        assert_eq!(img.dimensions(), (3, 2));
        assert_eq!(img.get_pixel(2, 1).0, [0x10, 0x20, 0x30, 0xFF]);
    }
}
