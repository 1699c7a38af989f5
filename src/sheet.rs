use crate::composite_cpu::{blit_over, fill_rect, stroke_rect};
use crate::error::{CardpressError, CardpressResult};
use crate::render::CardRaster;
use crate::scene::Color;

/// Fixed print grid: cards fill slots row-major, one page before the next.
#[derive(Clone, Debug)]
pub struct SheetLayout {
    pub page_width: u32,
    pub page_height: u32,
    pub slot_width: u32,
    pub slot_height: u32,
    pub columns: u32,
    pub rows: u32,
    pub gutter_x: u32,
    pub gutter_y: u32,
    pub margin_x: u32,
    pub margin_y: u32,
    pub background: Color,
    pub guide_color: Color,
    pub guide_thickness: u32,
}

impl Default for SheetLayout {
    /// A4 at 300 dpi with two columns of five CR80 landscape slots.
    fn default() -> Self {
        Self {
            page_width: 2480,
            page_height: 3508,
            slot_width: 1011,
            slot_height: 638,
            columns: 2,
            rows: 5,
            gutter_x: 40,
            gutter_y: 24,
            margin_x: 209,
            margin_y: 111,
            background: Color::white(),
            guide_color: Color::rgba(0.2, 0.2, 0.2, 1.0),
            guide_thickness: 2,
        }
    }
}

impl SheetLayout {
    pub fn slots_per_page(&self) -> usize {
        (self.columns as usize) * (self.rows as usize)
    }

    pub fn validate(&self) -> CardpressResult<()> {
        if self.page_width == 0 || self.page_height == 0 {
            return Err(CardpressError::validation("sheet page must not be empty"));
        }
        if self.slot_width == 0 || self.slot_height == 0 || self.columns == 0 || self.rows == 0 {
            return Err(CardpressError::validation("sheet grid must not be empty"));
        }
        let grid_w = self.margin_x as u64
            + u64::from(self.columns) * u64::from(self.slot_width)
            + u64::from(self.columns - 1) * u64::from(self.gutter_x);
        let grid_h = self.margin_y as u64
            + u64::from(self.rows) * u64::from(self.slot_height)
            + u64::from(self.rows - 1) * u64::from(self.gutter_y);
        if grid_w > u64::from(self.page_width) || grid_h > u64::from(self.page_height) {
            return Err(CardpressError::validation(
                "sheet grid does not fit on the page",
            ));
        }
        Ok(())
    }

    /// Top-left corner of slot `index` on its page, row-major.
    pub fn slot_origin(&self, index: usize) -> (u32, u32) {
        let col = (index as u32) % self.columns;
        let row = (index as u32) / self.columns;
        (
            self.margin_x + col * (self.slot_width + self.gutter_x),
            self.margin_y + row * (self.slot_height + self.gutter_y),
        )
    }
}

/// Contain fit of a `src_w` by `src_h` image into a slot: scaled by the
/// smaller axis ratio and centered. Returns (width, height, off_x, off_y).
pub fn contain_fit(src_w: u32, src_h: u32, slot_w: u32, slot_h: u32) -> (u32, u32, u32, u32) {
    if src_w == 0 || src_h == 0 || slot_w == 0 || slot_h == 0 {
        return (0, 0, 0, 0);
    }
    let scale = (f64::from(slot_w) / f64::from(src_w)).min(f64::from(slot_h) / f64::from(src_h));
    let w = ((f64::from(src_w) * scale).round() as u32).clamp(1, slot_w);
    let h = ((f64::from(src_h) * scale).round() as u32).clamp(1, slot_h);
    (w, h, (slot_w - w) / 2, (slot_h - h) / 2)
}

/// Tile rendered cards onto print pages.
///
/// Cards fill a page's slots in order; overflow starts the next page, and the
/// last page may be partial. Every placed card gets a full-slot cut-guide
/// border, regardless of how much of the slot the contained image covers.
#[tracing::instrument(skip(cards, layout))]
pub fn compose_sheets(
    cards: &[CardRaster],
    layout: &SheetLayout,
) -> CardpressResult<Vec<CardRaster>> {
    layout.validate()?;
    if cards.is_empty() {
        return Ok(Vec::new());
    }

    let pw = layout.page_width;
    let ph = layout.page_height;
    let bg = layout.background.to_rgba8_premul().as_array();
    let guide = layout.guide_color.to_rgba8_premul().as_array();

    let mut pages = Vec::new();
    for chunk in cards.chunks(layout.slots_per_page()) {
        let mut data = vec![0u8; (pw as usize) * (ph as usize) * 4];
        fill_rect(&mut data, pw, ph, 0, 0, pw, ph, bg)?;

        for (i, card) in chunk.iter().enumerate() {
            let (sx, sy) = layout.slot_origin(i);
            let (w, h, off_x, off_y) =
                contain_fit(card.width, card.height, layout.slot_width, layout.slot_height);
            if w > 0 && h > 0 {
                let resized = resize_premul(card, w, h)?;
                blit_over(&mut data, pw, ph, &resized, w, h, sx + off_x, sy + off_y)?;
            }
            stroke_rect(
                &mut data,
                pw,
                ph,
                sx,
                sy,
                layout.slot_width,
                layout.slot_height,
                layout.guide_thickness,
                guide,
            )?;
        }

        pages.push(CardRaster {
            width: pw,
            height: ph,
            data,
            premultiplied: true,
        });
    }
    Ok(pages)
}

/// Premultiplied RGBA8 pixels of `card` resampled to `w` by `h`.
fn resize_premul(card: &CardRaster, w: u32, h: u32) -> CardpressResult<Vec<u8>> {
    let mut src = card.data.clone();
    if !card.premultiplied {
        crate::assets::premultiply_rgba8_in_place(&mut src);
    }
    if card.width == w && card.height == h {
        return Ok(src);
    }
    let img = image::RgbaImage::from_raw(card.width, card.height, src)
        .ok_or_else(|| CardpressError::render("card raster byte length mismatch"))?;
    let resized = image::imageops::resize(&img, w, h, image::imageops::FilterType::Triangle);
    Ok(resized.into_raw())
}
