//! TOML configuration for the pop-up system and its notification layer.

use serde::Deserialize;
use std::path::{Path, PathBuf};

use log::{info, warn};

use crate::color::{default_text_palette, Color};
use crate::descriptor::SlideDirection;
use crate::error::{PopupError, Result};

#[derive(Debug, Clone, Deserialize)]
pub struct PopupConfig {
    #[serde(default)]
    pub popup: PopupSection,
    #[serde(default)]
    pub info: InfoSection,
}

#[derive(Debug, Clone, Deserialize)]
pub struct PopupSection {
    #[serde(default = "default_screen_width")]
    pub screen_width: u32,
    #[serde(default = "default_screen_height")]
    pub screen_height: u32,
    /// Fill of the `back:0` colour band.
    #[serde(default = "default_text_back_color")]
    pub text_back_color: Color,
    /// File name of numbered backgrounds; `%d` is replaced by the index.
    #[serde(default = "default_text_back_file_name")]
    pub text_back_file_name: String,
    #[serde(default = "default_system_dir")]
    pub system_dir: PathBuf,
    #[serde(default = "default_pictures_dir")]
    pub pictures_dir: PathBuf,
    #[serde(default = "default_se_dir")]
    pub se_dir: PathBuf,
    #[serde(default = "default_font_path")]
    pub font_path: PathBuf,
    #[serde(default = "default_font_size")]
    pub font_size: f32,
    /// Size the icon sheet is drawn at 1:1.
    #[serde(default = "default_font_size")]
    pub standard_font_size: f32,
    #[serde(default = "default_icon_set")]
    pub icon_set: PathBuf,
    pub animations: Option<PathBuf>,
    #[serde(default = "default_currency_unit")]
    pub currency_unit: String,
    #[serde(default = "default_initial_slots")]
    pub initial_slots: usize,
    #[serde(default = "default_text_palette")]
    pub text_colors: Vec<Color>,
}

impl Default for PopupSection {
    fn default() -> Self {
        PopupSection {
            screen_width: default_screen_width(),
            screen_height: default_screen_height(),
            text_back_color: default_text_back_color(),
            text_back_file_name: default_text_back_file_name(),
            system_dir: default_system_dir(),
            pictures_dir: default_pictures_dir(),
            se_dir: default_se_dir(),
            font_path: default_font_path(),
            font_size: default_font_size(),
            standard_font_size: default_font_size(),
            icon_set: default_icon_set(),
            animations: None,
            currency_unit: default_currency_unit(),
            initial_slots: default_initial_slots(),
            text_colors: default_text_palette(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
pub enum InfoPattern {
    Normal,
    Stretch,
    #[default]
    GrowUp,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
pub enum InfoPosition {
    #[default]
    Bottom,
    Up,
}

#[derive(Debug, Clone, Deserialize)]
pub struct InfoSection {
    #[serde(default = "default_true")]
    pub enabled: bool,
    #[serde(default)]
    pub pattern: InfoPattern,
    #[serde(default = "default_info_font_size")]
    pub font_size: f32,
    #[serde(default = "default_info_count")]
    pub count: u32,
    /// Gap between chained notifications.
    #[serde(default = "default_info_delay")]
    pub delay: u32,
    #[serde(default = "default_move_wait")]
    pub move_wait: u32,
    #[serde(default = "default_move_fade")]
    pub move_fade: u32,
    #[serde(default)]
    pub position: InfoPosition,
    #[serde(default)]
    pub slide_action: SlideDirection,
    #[serde(default)]
    pub sup_x: f64,
    #[serde(default)]
    pub sup_y: f64,
    #[serde(default = "default_screen_width")]
    pub width: u32,
    #[serde(default = "default_gold_icon")]
    pub gold_icon: u32,
    #[serde(default = "default_actor_icon_start")]
    pub actor_icon_start: u32,
    #[serde(default = "default_slide_count")]
    pub slide_count: u32,
    #[serde(default)]
    pub templates: InfoTemplates,
}

impl Default for InfoSection {
    fn default() -> Self {
        InfoSection {
            enabled: true,
            pattern: InfoPattern::default(),
            font_size: default_info_font_size(),
            count: default_info_count(),
            delay: default_info_delay(),
            move_wait: default_move_wait(),
            move_fade: default_move_fade(),
            position: InfoPosition::default(),
            slide_action: SlideDirection::default(),
            sup_x: 0.0,
            sup_y: 0.0,
            width: default_screen_width(),
            gold_icon: default_gold_icon(),
            actor_icon_start: default_actor_icon_start(),
            slide_count: default_slide_count(),
            templates: InfoTemplates::default(),
        }
    }
}

/// One template per category and direction. An empty string or `null` disables it.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct InfoTemplates {
    pub gold_gain: String,
    pub gold_loss: String,
    pub item_gain: String,
    pub item_loss: String,
    pub item_gain_many: String,
    pub item_loss_many: String,
    pub skill_learn: String,
    pub skill_forget: String,
    pub exp_up: String,
    pub exp_down: String,
    pub level_up: String,
    pub level_down: String,
    pub param_up: String,
    pub param_down: String,
    pub abp_up: String,
    pub abp_down: String,
    pub class_level_up: String,
    pub class_level_down: String,
    pub formation_up: String,
    pub formation_max: String,
}

impl Default for InfoTemplates {
    fn default() -> Self {
        let s = |t: &str| t.to_string();
        InfoTemplates {
            gold_gain: s(r"You Got 「\I[_icon]_num\C[14]\G\C[0]」 \C[24] Gold！"),
            gold_loss: s(r"You lost 「\I[_icon]_num\C[14]\G\C[0]」 \C[2]Gold"),
            item_gain: s(r"You found \C[24]「\I[_icon]_name」 ！\n\C[6]_desc1"),
            item_loss: s(r"You lost \C[24]「\I[_icon]_name」 ...\n\C[6]_desc1"),
            item_gain_many: s(r"You found \C[14]_num \C[24]「\I[_icon]_name s」 \C[24]！\n\C[6]_desc1"),
            item_loss_many: s(r"You lost \C[14]_num \C[24]「\I[_icon]_name s」 \C[24]...\n\C[6]_desc1"),
            skill_learn: s(r"\C[24]_actor \C[0]learned \C[24]「\I[_icon]_name」 \n\C[6]_desc1"),
            skill_forget: s(r"\C[24]_actor \C[0]forgot \C[24]「\I[_icon]_name」 \n\C[6]_desc1"),
            exp_up: s(r"\C[24]_actor \C[0]gained \C[14]_num\C[4]_name\C[0]Experience\C[24]!"),
            exp_down: s(r"\C[24]_actor \C[0]lost \C[14]_num\C[4]_name\C[0]Experience\C[24]..."),
            level_up: s(r"\C[4]_name \C[24]_actor \C[0]gained \C[14]_num \C[0]Levels\C[24]！"),
            level_down: s(r"\C[4]_name \C[24]_actor \C[0]lost \C[14]_num \C[0]Levels\C[24]..."),
            param_up: s(r"\C[24]_actor\C[0]'s \C[4]_name\C[0]raised by \C[14]_num\C[24]！"),
            param_down: s(r"\C[24]_actor\C[0]'s \C[4]_name \C[0]lowered by \C[14]_num\C[24]！"),
            abp_up: s(r"\C[24]_actor \C[0]gained \C[14]_num \C[4]_name \C[0]Experiences\C[24]！"),
            abp_down: s(r"\C[24]_actor \C[0]lost \C[14]_num \C[4]_name \C[0]Experiences\C[24]..."),
            class_level_up: s(r"\C[24]_actor 's job \C[4]_class _name \C[0]gained \C[14]_num \C[0]Levels\C[24]！"),
            class_level_down: s(r"\C[24]_actor 's job \C[4]_class _name \C[0]lost \C[14]_num \C[0]Levels\C[24]..."),
            formation_up: s(r"\C[4]_name \C[0]battle formation's level increased by\C[14]_num\C[24]！"),
            formation_max: s(r"\C[4]_name \C[0]battle formation's level \C[24]maxed out!"),
        }
    }
}

impl PopupConfig {
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .map_err(|e| PopupError::Config(format!("read {}: {e}", path.display())))?;
        toml::from_str(&content).map_err(|e| PopupError::Config(format!("parse {}: {e}", path.display())))
    }

    /// Load config with fallback chain:
    /// 1. $COMMON_POPUP_CONFIG env var
    /// 2. /etc/common-popup/popup.toml
    /// 3. {root}/popup.toml
    /// 4. Built-in defaults
    pub fn find_and_load(root: &Path) -> Self {
        let candidates: Vec<PathBuf> = vec![
            std::env::var("COMMON_POPUP_CONFIG").ok().map(PathBuf::from),
            Some(PathBuf::from("/etc/common-popup/popup.toml")),
            Some(root.join("popup.toml")),
        ]
        .into_iter()
        .flatten()
        .collect();

        for path in &candidates {
            if path.exists() {
                match Self::load(path) {
                    Ok(config) => {
                        info!("Loaded popup config from {}", path.display());
                        return config;
                    }
                    Err(e) => warn!("Failed to load {}: {e}", path.display()),
                }
            }
        }

        info!("Using built-in default popup config");
        Self::builtin_default()
    }

    pub fn builtin_default() -> Self {
        PopupConfig {
            popup: PopupSection::default(),
            info: InfoSection::default(),
        }
    }
}

impl PopupSection {
    /// File name for numbered background `index`.
    pub fn background_file_name(&self, index: u32) -> String {
        self.text_back_file_name.replace("%d", &index.to_string())
    }
}

fn default_screen_width() -> u32 { 816 }
fn default_screen_height() -> u32 { 624 }
fn default_text_back_color() -> Color { Color::rgba(0, 0, 0, 153) }
fn default_text_back_file_name() -> String { "popup_back%d".into() }
fn default_system_dir() -> PathBuf { PathBuf::from("img/system") }
fn default_pictures_dir() -> PathBuf { PathBuf::from("img/pictures") }
fn default_se_dir() -> PathBuf { PathBuf::from("audio/se") }
fn default_font_path() -> PathBuf { PathBuf::from("fonts/mplus-1m-regular.ttf") }
fn default_font_size() -> f32 { 28.0 }
fn default_icon_set() -> PathBuf { PathBuf::from("img/system/IconSet.png") }
fn default_currency_unit() -> String { "G".into() }
fn default_initial_slots() -> usize { 50 }
fn default_true() -> bool { true }
fn default_info_font_size() -> f32 { 20.0 }
fn default_info_count() -> u32 { 120 }
fn default_info_delay() -> u32 { 20 }
fn default_move_wait() -> u32 { 100 }
fn default_move_fade() -> u32 { 20 }
fn default_gold_icon() -> u32 { 314 }
fn default_actor_icon_start() -> u32 { 320 }
fn default_slide_count() -> u32 { 60 }
