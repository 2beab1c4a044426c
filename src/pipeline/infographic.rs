//! Renders the 1920×1080 results image of a match.
//!
//! The image has three columns: match information on the left, the starters
//! laid out by formation in the middle, and the substitutes on the right.
//! Nothing in the results can make rendering fail: missing images fall back
//! to a placeholder and missing fonts leave the text out. Only writing the
//! destination file is an error.

use log::{debug, info, warn};

use crate::pipeline::*;

use ab_glyph::{FontVec, PxScale};
use image::imageops::{self, FilterType};
use image::{DynamicImage, ImageFormat, Rgba, RgbaImage};
use imageproc::drawing::{
    draw_filled_circle_mut, draw_filled_rect_mut, draw_polygon_mut, draw_text_mut, text_size,
};
use imageproc::point::Point;
use imageproc::rect::Rect;
use player_ratings::formations::distribute_rows;
use std::fs;

pub const WIDTH: u32 = 1920;
pub const HEIGHT: u32 = 1080;

pub const LEFT_W: u32 = 422;
pub const MAIN_W: u32 = 1075;
pub const RIGHT_W: u32 = WIDTH - LEFT_W - MAIN_W;
pub const MAIN_X: u32 = LEFT_W;
pub const RIGHT_X: u32 = LEFT_W + MAIN_W;

const MAX_QUOTE_LINES: usize = 4;
const PHOTO_MAX_HEIGHT: u32 = 160;
const STARTER_IMAGE_SIZE: u32 = 70;
const SUB_IMAGE_SIZE: u32 = 60;
const MAX_SUB_SPACING: i32 = 180;

fn rgb(r: u8, g: u8, b: u8) -> Rgba<u8> {
    Rgba([r, g, b, 255])
}

/// The colours of the image.
#[derive(PartialEq, Debug, Clone, Copy)]
pub struct Palette {
    pub navy: Rgba<u8>,
    pub sidebar: Rgba<u8>,
    /// Blended over `navy`, more strongly towards the bottom of the pitch.
    pub gradient: Rgba<u8>,
    pub yellow: Rgba<u8>,
    pub white: Rgba<u8>,
    pub light_gray: Rgba<u8>,
    pub black: Rgba<u8>,
    pub pill: Rgba<u8>,
    pub card: Rgba<u8>,
    pub silhouette: Rgba<u8>,
    pub silhouette_figure: Rgba<u8>,
    pub assist: Rgba<u8>,
    pub own_goal: Rgba<u8>,
}

impl Default for Palette {
    fn default() -> Palette {
        Palette {
            navy: rgb(15, 20, 50),
            sidebar: rgb(18, 22, 48),
            gradient: rgb(20, 40, 100),
            yellow: rgb(255, 210, 50),
            white: rgb(255, 255, 255),
            light_gray: rgb(180, 180, 180),
            black: rgb(0, 0, 0),
            pill: rgb(20, 20, 20),
            card: rgb(30, 35, 60),
            silhouette: rgb(160, 160, 160),
            silhouette_figure: rgb(80, 80, 80),
            assist: rgb(90, 170, 255),
            own_goal: rgb(220, 50, 50),
        }
    }
}

/// Everything the renderer needs besides the results.
#[derive(PartialEq, Debug, Clone)]
pub struct RenderConfig {
    pub font: Option<PathBuf>,
    pub bold_font: Option<PathBuf>,
    /// Used for players without a usable image.
    pub placeholder: Option<PathBuf>,
    /// How the club is named on the score block.
    pub club_label: String,
    pub palette: Palette,
}

impl Default for RenderConfig {
    fn default() -> RenderConfig {
        RenderConfig {
            font: None,
            bold_font: None,
            placeholder: None,
            club_label: DEFAULT_CLUB_LABEL.to_string(),
            palette: Palette::default(),
        }
    }
}

// ********* Layout ***********

/// Vertical centres of the formation rows, attackers first.
pub fn row_centres(num_rows: usize) -> Vec<i32> {
    let y_start = 60;
    let y_end = HEIGHT as i32 - 100;
    let spacing = (y_end - y_start) / num_rows.max(1) as i32;
    (0..num_rows as i32)
        .map(|i| y_start + i * spacing + spacing / 2)
        .collect()
}

/// Horizontal centres of the players of a row in the main area.
pub fn column_centres(num_players: usize) -> Vec<i32> {
    let spacing = MAIN_W as i32 / (num_players as i32 + 1);
    (1..=num_players as i32)
        .map(|i| MAIN_X as i32 + spacing * i)
        .collect()
}

/// Vertical centres of the substitute cards.
pub fn sub_centres(num_subs: usize) -> Vec<i32> {
    if num_subs == 0 {
        return vec![];
    }
    let available = HEIGHT as i32 - 60;
    let spacing = (available / num_subs as i32).min(MAX_SUB_SPACING);
    let start = 60 + spacing / 2;
    (0..num_subs as i32).map(|i| start + i * spacing).collect()
}

/// Greedy word wrapping. A word wider than `max_width` gets a line of its own.
pub fn wrap_words<F: Fn(&str) -> u32>(text: &str, max_width: u32, measure: F) -> Vec<String> {
    let mut lines: Vec<String> = Vec::new();
    let mut current = String::new();
    for word in text.split_whitespace() {
        let candidate = if current.is_empty() {
            word.to_string()
        } else {
            format!("{} {}", current, word)
        };
        if measure(&candidate) > max_width {
            if !current.is_empty() {
                lines.push(std::mem::take(&mut current));
            }
            current = word.to_string();
        } else {
            current = candidate;
        }
    }
    if !current.is_empty() {
        lines.push(current);
    }
    lines
}

/// One mark under a player card.
#[derive(PartialEq, Debug, Clone, Copy)]
pub enum Badge {
    Dot(Rgba<u8>),
    Label(&'static str),
}

/// Goals, then assists, then own goals (one dot each) and the MOTM label.
pub fn player_badges(player: &PlayerRating, palette: &Palette) -> Vec<Badge> {
    let mut badges = Vec::new();
    badges.extend((0..player.goals).map(|_| Badge::Dot(palette.white)));
    badges.extend((0..player.assists).map(|_| Badge::Dot(palette.assist)));
    badges.extend((0..player.own_goals).map(|_| Badge::Dot(palette.own_goal)));
    if player.is_motm {
        badges.push(Badge::Label("MOTM"));
    }
    badges
}

fn blend(over: Rgba<u8>, base: Rgba<u8>, alpha: u32) -> Rgba<u8> {
    let mix = |o: u8, b: u8| ((o as u32 * alpha + b as u32 * (255 - alpha)) / 255) as u8;
    Rgba([
        mix(over[0], base[0]),
        mix(over[1], base[1]),
        mix(over[2], base[2]),
        255,
    ])
}

// ********* Resources ***********

fn load_font(path: &Path) -> Option<FontVec> {
    let bytes = match fs::read(path) {
        Ok(b) => b,
        Err(e) => {
            warn!("Could not read font {:?}: {}", path, e);
            return None;
        }
    };
    match FontVec::try_from_vec(bytes) {
        Ok(font) => Some(font),
        Err(e) => {
            warn!("Invalid font {:?}: {}", path, e);
            None
        }
    }
}

fn open_image(path: &Path, what: &str) -> Option<DynamicImage> {
    if !path.is_file() {
        warn!("{} not found: {:?}", what, path);
        return None;
    }
    match image::open(path) {
        Ok(img) => Some(img),
        Err(e) => {
            warn!("Could not load {} {:?}: {}", what, path, e);
            None
        }
    }
}

/// A grey disc with a head and shoulders.
fn silhouette(size: u32, palette: &Palette) -> RgbaImage {
    let mut img = RgbaImage::new(size, size);
    let s = size as i32;
    draw_filled_circle_mut(&mut img, (s / 2, s / 2), s / 2 - 1, palette.silhouette);
    draw_filled_circle_mut(&mut img, (s / 2, s * 2 / 5), s / 6, palette.silhouette_figure);
    draw_filled_rect_mut(
        &mut img,
        Rect::at(s / 4, s * 5 / 8).of_size((size / 2).max(1), (size / 5).max(1)),
        palette.silhouette_figure,
    );
    img
}

struct Renderer<'a> {
    config: &'a RenderConfig,
    regular: Option<FontVec>,
    bold: Option<FontVec>,
    placeholder: Option<DynamicImage>,
}

impl<'a> Renderer<'a> {
    fn new(config: &'a RenderConfig) -> Renderer<'a> {
        let regular = config.font.as_deref().and_then(load_font);
        let bold = config.bold_font.as_deref().and_then(load_font);
        if regular.is_none() && bold.is_none() {
            warn!("No usable font configured, the infographic will not contain text");
        }
        let placeholder = config
            .placeholder
            .as_deref()
            .and_then(|p| open_image(p, "Placeholder image"));
        Renderer {
            config,
            regular,
            bold,
            placeholder,
        }
    }

    fn palette(&self) -> &Palette {
        &self.config.palette
    }

    fn font(&self, bold: bool) -> Option<&FontVec> {
        if bold {
            self.bold.as_ref().or(self.regular.as_ref())
        } else {
            self.regular.as_ref().or(self.bold.as_ref())
        }
    }

    /// Size of the text. Without a font, an estimate keeps the layout stable.
    fn measure(&self, text: &str, size: f32, bold: bool) -> (u32, u32) {
        match self.font(bold) {
            Some(font) => text_size(PxScale::from(size), font, text),
            None => ((text.chars().count() as f32 * size * 0.55) as u32, size as u32),
        }
    }

    #[allow(clippy::too_many_arguments)]
    fn text(&self, canvas: &mut RgbaImage, text: &str, x: i32, y: i32, size: f32, bold: bool, color: Rgba<u8>) {
        if let Some(font) = self.font(bold) {
            draw_text_mut(canvas, color, x, y, PxScale::from(size), font, text);
        }
    }

    /// Draws the text centred on `cx` and returns the y below it.
    #[allow(clippy::too_many_arguments)]
    fn text_centered(
        &self,
        canvas: &mut RgbaImage,
        text: &str,
        cx: i32,
        y: i32,
        size: f32,
        bold: bool,
        color: Rgba<u8>,
    ) -> i32 {
        let (w, h) = self.measure(text, size, bold);
        self.text(canvas, text, cx - w as i32 / 2, y, size, bold, color);
        y + h as i32
    }

    fn thumbnail(&self, image_path: Option<&str>, size: u32) -> RgbaImage {
        let own = image_path.and_then(|p| open_image(Path::new(p), "Player image"));
        match own.as_ref().or(self.placeholder.as_ref()) {
            Some(img) => img.resize_exact(size, size, FilterType::Lanczos3).to_rgba8(),
            None => silhouette(size, self.palette()),
        }
    }

    // ********* Drawing ***********

    fn render(&self, results: &CompiledResults, quote: Option<&str>, photo: Option<&Path>) -> RgbaImage {
        let mut canvas = RgbaImage::from_pixel(WIDTH, HEIGHT, self.palette().navy);
        self.draw_left_sidebar(&mut canvas, results, quote, photo);
        self.draw_main(&mut canvas, results);
        self.draw_right_sidebar(&mut canvas, results);
        canvas
    }

    fn draw_left_sidebar(
        &self,
        canvas: &mut RgbaImage,
        results: &CompiledResults,
        quote: Option<&str>,
        photo: Option<&Path>,
    ) {
        let p = *self.palette();
        let meta = &results.match_metadata;
        draw_filled_rect_mut(canvas, Rect::at(0, 0).of_size(LEFT_W, HEIGHT), p.navy);

        let cx = LEFT_W as i32 / 2;
        let mut y = 20;
        y = self.text_centered(canvas, &meta.competition.to_uppercase(), cx, y, 16.0, true, p.yellow) + 4;
        y = self.text_centered(canvas, &meta.matchday, cx, y, 12.0, false, p.light_gray) + 2;
        let place = format!("{}  •  {}", meta.venue, meta.date);
        y = self.text_centered(canvas, &place, cx, y, 12.0, false, p.light_gray) + 16;

        let club = self.config.club_label.clone();
        let opponent = meta.opponent.to_uppercase();
        let (left_team, right_team, left_rating, right_rating) = if meta.is_home {
            (club, opponent, results.team_rating, results.opponent_rating)
        } else {
            (opponent, club, results.opponent_rating, results.team_rating)
        };
        y = self.text_centered(canvas, &left_team, cx, y, 14.0, true, p.white) + 2;
        let score = format!("{}  -  {}", meta.home_score, meta.away_score);
        y = self.text_centered(canvas, &score, cx, y, 36.0, true, p.white) + 2;
        y = self.text_centered(canvas, &right_team, cx, y, 14.0, true, p.white) + 6;
        let ratings = format!("{:.1}  vs  {:.1}", left_rating.mean, right_rating.mean);
        y = self.text_centered(canvas, &ratings, cx, y, 12.0, false, p.light_gray) + 20;

        // Overall rating diamond
        let r = 28;
        let dcy = y + 30;
        let diamond = [
            Point::new(cx, dcy - r),
            Point::new(cx + r, dcy),
            Point::new(cx, dcy + r),
            Point::new(cx - r, dcy),
        ];
        draw_polygon_mut(canvas, &diamond, p.yellow);
        let overall = format!("{:.1}", results.overall_rating);
        let (_, th) = self.measure(&overall, 22.0, true);
        self.text_centered(canvas, &overall, cx, dcy - th as i32 / 2, 22.0, true, p.black);
        y = dcy + r + 6;
        y = self.text_centered(canvas, "OVERALL", cx, y, 12.0, false, p.light_gray) + 16;

        self.draw_manager_card(canvas, &results.coach_ratings, cx, y);
        y += 100;

        match photo.and_then(|path| open_image(path, "Photo")) {
            Some(img) if img.width() > 0 => {
                let photo_w = LEFT_W - 30;
                let scaled = (img.height() as f64 * photo_w as f64 / img.width() as f64) as u32;
                let photo_h = scaled.min(PHOTO_MAX_HEIGHT);
                if photo_h > 0 {
                    let resized = img.resize_exact(photo_w, photo_h, FilterType::Lanczos3).to_rgba8();
                    imageops::overlay(canvas, &resized, 15, y as i64);
                    y += photo_h as i32;
                }
                y += 8;
            }
            _ => y += 8,
        }

        if let Some(quote) = quote.filter(|q| !q.trim().is_empty()) {
            self.draw_quote(canvas, quote, cx, y, LEFT_W - 30);
        }
    }

    fn draw_manager_card(&self, canvas: &mut RgbaImage, coach: &CoachRatings, cx: i32, y: i32) {
        let p = *self.palette();
        let card_w = LEFT_W - 30;
        fill_rounded_rect(canvas, cx - card_w as i32 / 2, y, card_w, 90, 8, p.card);
        self.text_centered(canvas, &coach.name.to_uppercase(), cx, y + 6, 14.0, true, p.white);
        let rows = [
            ("XI Selection", coach.starting_eleven),
            ("Tactics", coach.on_field_tactics),
            ("Subs", coach.substitutions),
        ];
        let mut row_y = y + 28;
        for (label, stats) in rows.iter() {
            let line = format!("{}: {:.1}", label, stats.mean);
            self.text_centered(canvas, &line, cx, row_y, 12.0, false, p.light_gray);
            row_y += 18;
        }
    }

    fn draw_quote(&self, canvas: &mut RgbaImage, quote: &str, cx: i32, y: i32, max_width: u32) {
        let p = *self.palette();
        let lines = wrap_words(quote, max_width, |s| self.measure(s, 12.0, false).0);
        self.text_centered(canvas, "\"QUOTE OF THE MATCH\"", cx, y, 12.0, false, p.yellow);
        let mut y = y + 18;
        for line in lines.iter().take(MAX_QUOTE_LINES) {
            y = self.text_centered(canvas, line, cx, y, 12.0, false, p.white) + 2;
        }
    }

    fn draw_main(&self, canvas: &mut RgbaImage, results: &CompiledResults) {
        let p = *self.palette();
        for y in 0..HEIGHT {
            let alpha = 100 + 60 * y / HEIGHT;
            let color = blend(p.gradient, p.navy, alpha);
            draw_filled_rect_mut(canvas, Rect::at(MAIN_X as i32, y as i32).of_size(MAIN_W, 1), color);
        }

        let centre_x = (MAIN_X + MAIN_W / 2) as i32;
        let header = format!("PLAYER RATINGS  •  {} RESPONSES", results.total_responses);
        self.text_centered(canvas, &header, centre_x, 12, 14.0, true, p.white);

        let rows = distribute_rows(&results.formation, &results.starting_player_ratings);
        if rows.len() == 1 && !results.formation.trim().is_empty() {
            debug!("draw_main: formation {:?} laid out as a single row", results.formation);
        }
        for (row, cy) in rows.iter().zip(row_centres(rows.len())) {
            for (player, cx) in row.iter().zip(column_centres(row.len())) {
                self.draw_player_card(canvas, player, cx, cy, STARTER_IMAGE_SIZE);
            }
        }

        let referee = format!("REFEREE: {:.1}", results.referee_rating.mean);
        self.text_centered(canvas, &referee, centre_x, HEIGHT as i32 - 70, 12.0, true, p.white);
        self.draw_legend(canvas, HEIGHT as i32 - 40);
    }

    fn draw_legend(&self, canvas: &mut RgbaImage, y: i32) {
        let p = *self.palette();
        let items = [
            (Some(p.yellow), "= Avg Rating", p.yellow),
            (Some(p.white), "= Goal", p.white),
            (Some(p.assist), "= Assist", p.white),
            (Some(p.own_goal), "= Own Goal", p.white),
            (None, "±n = Std Dev", p.light_gray),
        ];
        let mut x = MAIN_X as i32 + 30;
        for (dot, text, color) in items.iter() {
            if let Some(dot) = dot {
                draw_filled_circle_mut(canvas, (x + 5, y + 6), 5, *dot);
                x += 14;
            }
            self.text(canvas, text, x, y, 10.0, false, *color);
            x += self.measure(text, 10.0, false).0 as i32 + 20;
        }
    }

    fn draw_right_sidebar(&self, canvas: &mut RgbaImage, results: &CompiledResults) {
        let p = *self.palette();
        draw_filled_rect_mut(canvas, Rect::at(RIGHT_X as i32, 0).of_size(RIGHT_W, HEIGHT), p.sidebar);
        let cx = (RIGHT_X + RIGHT_W / 2) as i32;
        self.text_centered(canvas, "SUBSTITUTES", cx, 16, 14.0, true, p.yellow);

        let subs = &results.substitute_player_ratings;
        if subs.is_empty() {
            self.text_centered(canvas, "No substitutions", cx, 50, 11.0, false, p.light_gray);
            return;
        }
        for (player, cy) in subs.iter().zip(sub_centres(subs.len())) {
            self.draw_player_card(canvas, player, cx, cy, SUB_IMAGE_SIZE);
        }
    }

    fn draw_player_card(&self, canvas: &mut RgbaImage, player: &PlayerRating, cx: i32, cy: i32, size: u32) {
        let p = *self.palette();
        let thumb = self.thumbnail(player.image_path.as_deref(), size);
        let top = cy - size as i32 / 2 - 20;
        imageops::overlay(canvas, &thumb, (cx - size as i32 / 2) as i64, top as i64);

        // Name pill
        let name_y = top + size as i32 + 2;
        let name = player.name.to_uppercase();
        let (tw, th) = self.measure(&name, 11.0, true);
        let (pad_x, pad_y) = (8, 2);
        let pill_h = th + 2 * pad_y;
        fill_rounded_rect(
            canvas,
            cx - tw as i32 / 2 - pad_x as i32,
            name_y,
            tw + 2 * pad_x,
            pill_h,
            pill_h / 2,
            p.pill,
        );
        self.text(canvas, &name, cx - tw as i32 / 2, name_y + pad_y as i32, 11.0, true, p.white);

        // Rating badge and spread
        let rating_y = name_y + 22;
        let rcy = rating_y + 14;
        draw_filled_circle_mut(canvas, (cx, rcy), 14, p.yellow);
        let mean = format!("{:.1}", player.rating.mean);
        let (_, mh) = self.measure(&mean, 13.0, true);
        self.text_centered(canvas, &mean, cx, rcy - mh as i32 / 2, 13.0, true, p.black);
        let spread = format!("±{:.1}", player.rating.std_dev);
        self.text(canvas, &spread, cx + 18, rating_y + 8, 10.0, false, p.light_gray);

        self.draw_badges(canvas, &player_badges(player, &p), cx, rating_y + 32);
    }

    fn draw_badges(&self, canvas: &mut RgbaImage, badges: &[Badge], cx: i32, y: i32) {
        if badges.is_empty() {
            return;
        }
        let gap = 3;
        let widths: Vec<i32> = badges
            .iter()
            .map(|b| match b {
                Badge::Dot(_) => 10,
                Badge::Label(text) => self.measure(text, 10.0, true).0 as i32,
            })
            .collect();
        let total: i32 = widths.iter().sum::<i32>() + gap * (widths.len() as i32 - 1);
        let mut x = cx - total / 2;
        for (badge, w) in badges.iter().zip(widths.iter()) {
            match badge {
                Badge::Dot(color) => draw_filled_circle_mut(canvas, (x + 5, y + 6), 5, *color),
                Badge::Label(text) => self.text(canvas, text, x, y, 10.0, true, self.palette().yellow),
            }
            x += w + gap;
        }
    }
}

fn fill_rounded_rect(canvas: &mut RgbaImage, x: i32, y: i32, w: u32, h: u32, radius: u32, color: Rgba<u8>) {
    if w == 0 || h == 0 {
        return;
    }
    let r = radius.min(w / 2).min(h / 2);
    let ri = r as i32;
    if w > 2 * r {
        draw_filled_rect_mut(canvas, Rect::at(x + ri, y).of_size(w - 2 * r, h), color);
    }
    if h > 2 * r {
        draw_filled_rect_mut(canvas, Rect::at(x, y + ri).of_size(w, h - 2 * r), color);
    }
    if r > 0 {
        let (right, bottom) = (x + w as i32 - 1 - ri, y + h as i32 - 1 - ri);
        for centre in [(x + ri, y + ri), (right, y + ri), (x + ri, bottom), (right, bottom)] {
            draw_filled_circle_mut(canvas, centre, ri, color);
        }
    }
}

fn temp_sibling(path: &Path) -> PathBuf {
    let name = path
        .file_name()
        .map(|n| n.to_string_lossy().to_string())
        .unwrap_or_else(|| "infographic.png".to_string());
    path.with_file_name(format!(".{}.tmp", name))
}

/// Renders the results image and writes it as an RGB PNG at `out_path`.
///
/// The image is first written next to the destination and then moved in
/// place, so an existing image is only replaced by a complete one.
pub fn render_infographic(
    results: &CompiledResults,
    quote: Option<&str>,
    photo: Option<&Path>,
    out_path: &Path,
    config: &RenderConfig,
) -> PipelineResult<PathBuf> {
    debug!(
        "render_infographic: match {} to {:?}",
        results.match_id, out_path
    );
    let canvas = Renderer::new(config).render(results, quote, photo);
    let image = DynamicImage::ImageRgba8(canvas).to_rgb8();

    let p = out_path.display().to_string();
    if let Some(parent) = out_path.parent() {
        fs::create_dir_all(parent).context(WritingFileSnafu { path: p.clone() })?;
    }
    let tmp = temp_sibling(out_path);
    let saved = image
        .save_with_format(&tmp, ImageFormat::Png)
        .context(EncodingImageSnafu { path: p.clone() });
    if let Err(e) = saved {
        if fs::remove_file(&tmp).is_err() {
            debug!("render_infographic: no temporary file to remove at {:?}", tmp);
        }
        return Err(e);
    }
    fs::rename(&tmp, out_path).context(WritingFileSnafu { path: p })?;
    info!("Infographic saved to {:?}", out_path);
    Ok(out_path.to_path_buf())
}
