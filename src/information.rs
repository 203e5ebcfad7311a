//! Notification pop-ups for gains and losses: gold, items, experience, levels, skills.
//!
//! [`format_info`] turns a (subject, delta, category) triple into display lines and an
//! optional sound cue; [`info_descriptor`] places the rendered panel on screen according
//! to the configured pattern and position.

use crate::config::{InfoPattern, InfoPosition, InfoSection, InfoTemplates};
use crate::descriptor::{Background, Breakpoints, Pattern, PopupDescriptor, SlideDirection, SoundCue};
use crate::host::{ImageHandle, Vec2};
use crate::text::strip_color_codes;

#[derive(Debug, Clone, PartialEq)]
pub enum InfoCategory {
    Gold,
    Item,
    Exp,
    Level,
    Abp,
    ClassLevel,
    Param,
    Skill,
    FormationLevel { maxed: bool },
    /// Free text, shown as written.
    Custom(String),
}

impl InfoCategory {
    fn template<'a>(&'a self, templates: &'a InfoTemplates, delta: i64) -> &'a str {
        let pick = |gain: &'a String, loss: &'a String| if delta > 0 { gain } else { loss };
        let chosen = match self {
            InfoCategory::Gold => pick(&templates.gold_gain, &templates.gold_loss),
            InfoCategory::Item => match delta {
                d if d > 1 => &templates.item_gain_many,
                -1 => &templates.item_loss,
                d if d < -1 => &templates.item_loss_many,
                _ => &templates.item_gain,
            },
            InfoCategory::Exp => pick(&templates.exp_up, &templates.exp_down),
            InfoCategory::Level => pick(&templates.level_up, &templates.level_down),
            InfoCategory::Abp => pick(&templates.abp_up, &templates.abp_down),
            InfoCategory::ClassLevel => pick(&templates.class_level_up, &templates.class_level_down),
            InfoCategory::Param => pick(&templates.param_up, &templates.param_down),
            InfoCategory::Skill => pick(&templates.skill_learn, &templates.skill_forget),
            InfoCategory::FormationLevel { maxed: true } => &templates.formation_max,
            InfoCategory::FormationLevel { maxed: false } => &templates.formation_up,
            InfoCategory::Custom(text) => text,
        };
        chosen.as_str()
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InfoActor {
    pub id: u32,
    pub name: String,
}

/// What changed: an item, skill, stat or formation, plus who it happened to.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct InfoSubject {
    pub name: String,
    pub icon: Option<u32>,
    /// Up to two lines, separated by `\n`.
    pub description: String,
    pub actor: Option<InfoActor>,
    pub class_name: Option<String>,
}

impl InfoSubject {
    pub fn named(name: impl Into<String>) -> Self {
        InfoSubject {
            name: name.into(),
            ..InfoSubject::default()
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct InfoMessage {
    pub lines: Vec<String>,
    pub sound: Option<SoundCue>,
}

/// Split a leading `_SE[name,volume,pitch,pan]` off `text`. The prefix is case-insensitive.
pub fn take_sound_prefix(text: &str) -> (Option<SoundCue>, &str) {
    let is_prefix = text.get(..4).is_some_and(|head| head.eq_ignore_ascii_case("_se["));
    if !is_prefix {
        return (None, text);
    }
    let Some(end) = text[4..].find(']') else {
        return (None, text);
    };
    let spec = &text[4..4 + end];
    match SoundCue::parse(spec) {
        Ok(cue) => (Some(cue), &text[4 + end + 1..]),
        Err(_) => (None, text),
    }
}

/// Build the notification for `delta` of `subject`. Returns `None` when nothing should
/// be shown: zero delta, a disabled template, or no visible lines.
pub fn format_info(subject: &InfoSubject, delta: i64, category: &InfoCategory, settings: &InfoSection) -> Option<InfoMessage> {
    if delta == 0 && !matches!(category, InfoCategory::Custom(_)) {
        return None;
    }
    let template = category.template(&settings.templates, delta);
    if template.is_empty() || template == "null" {
        return None;
    }

    let (sound, body) = take_sound_prefix(template);
    let mut text = body.to_string();

    if !matches!(category, InfoCategory::Custom(_)) {
        if let Some(actor) = &subject.actor {
            text = text
                .replace("_actor", &actor.name)
                .replace("_aicon", &(actor.id + settings.actor_icon_start).saturating_sub(1).to_string());
        }
        if let Some(class_name) = &subject.class_name {
            text = text.replace("_class", class_name);
        }
        let icon = match category {
            InfoCategory::Gold => subject.icon.unwrap_or(settings.gold_icon),
            _ => subject.icon.unwrap_or(0),
        };
        let mut descriptions = subject.description.split('\n');
        let desc1 = descriptions.next().unwrap_or_default();
        let desc2 = descriptions.next().unwrap_or_default();
        text = text
            .replace("_name", &subject.name)
            .replace("_icon", &icon.to_string())
            .replace("_num", &delta.unsigned_abs().to_string())
            .replace("_desc1", desc1)
            .replace("_desc2", desc2);
    }

    let lines: Vec<String> = text
        .split('\n')
        .flat_map(|line| line.split("\\n"))
        .filter(|line| !strip_color_codes(line).is_empty())
        .map(str::to_string)
        .collect();
    if lines.is_empty() {
        return None;
    }
    Some(InfoMessage { lines, sound })
}

/// Place a rendered notification panel on screen.
pub fn info_descriptor(panel: ImageHandle, sound: Option<SoundCue>, settings: &InfoSection, screen: Vec2) -> PopupDescriptor {
    let height = panel.height() as f64;
    let (pattern, mut position, move_x, anchor) = match settings.pattern {
        InfoPattern::GrowUp => {
            let anchor_y = if settings.slide_action == SlideDirection::Down { 0.0 } else { 1.0 };
            (Pattern::GrowUp, Vec2::new(settings.sup_x, screen.y), 0.0, Vec2::new(0.0, anchor_y))
        }
        InfoPattern::Stretch => (
            Pattern::Stretch,
            Vec2::new(settings.sup_x, screen.y - height),
            0.0,
            Vec2::ZERO,
        ),
        InfoPattern::Normal => (
            Pattern::Normal,
            Vec2::new(settings.sup_x - screen.x, screen.y - height),
            screen.x,
            Vec2::ZERO,
        ),
    };
    if settings.position == InfoPosition::Up {
        position.y = 0.0;
        if settings.pattern == InfoPattern::GrowUp && settings.slide_action != SlideDirection::Down {
            position.y = height;
        }
    }
    position.y += settings.sup_y;

    let duration = settings.count.max(1);
    let total = duration as f64;
    let fade_in_end = (settings.move_fade as f64).min(total);
    let fade_out_start = (settings.move_wait as f64).clamp(fade_in_end, total);

    PopupDescriptor {
        position,
        move_offset: Vec2::new(move_x, 0.0),
        anchor,
        pattern,
        background: Background::Transparent,
        duration,
        delay: 0,
        fixed: false,
        extend: Some(Breakpoints::new(fade_in_end, fade_out_start)),
        slide_count: (settings.slide_count > 0).then_some(settings.slide_count),
        slide_direction: settings.slide_action,
        sound,
        ..PopupDescriptor::with_bitmap(panel)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::solid_image;

    fn settings() -> InfoSection {
        InfoSection::default()
    }

    fn potion() -> InfoSubject {
        InfoSubject {
            name: "Potion".into(),
            icon: Some(176),
            description: "Restores 500 HP.\nSingle ally.".into(),
            ..InfoSubject::default()
        }
    }

    #[test]
    fn item_templates_follow_delta() {
        let s = settings();
        let one = format_info(&potion(), 1, &InfoCategory::Item, &s).unwrap();
        assert_eq!(one.lines[0], r"You found \C[24]「\I[176]Potion」 ！");
        assert_eq!(one.lines[1], r"\C[6]Restores 500 HP.");

        let many = format_info(&potion(), 3, &InfoCategory::Item, &s).unwrap();
        assert!(many.lines[0].starts_with(r"You found \C[14]3 "));

        let lost = format_info(&potion(), -1, &InfoCategory::Item, &s).unwrap();
        assert!(lost.lines[0].starts_with("You lost"));

        let lost_many = format_info(&potion(), -4, &InfoCategory::Item, &s).unwrap();
        assert!(lost_many.lines[0].starts_with(r"You lost \C[14]4 "));
    }

    #[test]
    fn zero_delta_shows_nothing() {
        assert!(format_info(&potion(), 0, &InfoCategory::Item, &settings()).is_none());
    }

    #[test]
    fn disabled_templates_show_nothing() {
        let mut s = settings();
        s.templates.gold_gain = String::new();
        s.templates.gold_loss = "null".into();
        assert!(format_info(&InfoSubject::default(), 10, &InfoCategory::Gold, &s).is_none());
        assert!(format_info(&InfoSubject::default(), -10, &InfoCategory::Gold, &s).is_none());
    }

    #[test]
    fn gold_uses_configured_icon_and_absolute_amount() {
        let msg = format_info(&InfoSubject::default(), -250, &InfoCategory::Gold, &settings()).unwrap();
        assert_eq!(msg.lines, vec![r"You lost 「\I[314]250\C[14]\G\C[0]」 \C[2]Gold".to_string()]);
    }

    #[test]
    fn actor_and_class_placeholders() {
        let subject = InfoSubject {
            name: "Lv".into(),
            actor: Some(InfoActor { id: 3, name: "Reid".into() }),
            class_name: Some("Knight".into()),
            ..InfoSubject::default()
        };
        let mut s = settings();
        s.templates.class_level_up = "_actor/_aicon/_class/_name/_num".into();
        let msg = format_info(&subject, 2, &InfoCategory::ClassLevel, &s).unwrap();
        assert_eq!(msg.lines, vec!["Reid/322/Knight/Lv/2".to_string()]);
    }

    #[test]
    fn sound_prefix_is_stripped() {
        let mut s = settings();
        s.templates.level_up = "_se[Skill3,80]\\C[4]_name up".into();
        let msg = format_info(&InfoSubject::named("Level"), 1, &InfoCategory::Level, &s).unwrap();
        let cue = msg.sound.unwrap();
        assert_eq!((cue.name.as_str(), cue.volume, cue.pitch, cue.pan), ("Skill3", 80, 100, 0));
        assert_eq!(msg.lines, vec![r"\C[4]Level up".to_string()]);
    }

    #[test]
    fn lines_split_on_real_and_literal_newlines_and_drop_colour_only_lines() {
        let mut s = settings();
        s.templates.param_up = "a\nb\\nc\\n\\C[6]_desc2".into();
        let msg = format_info(&InfoSubject::named("ATK"), 5, &InfoCategory::Param, &s).unwrap();
        assert_eq!(msg.lines, vec!["a", "b", "c"]);
    }

    #[test]
    fn skill_forget_uses_its_own_template() {
        let subject = InfoSubject {
            name: "Heal".into(),
            actor: Some(InfoActor { id: 1, name: "Ann".into() }),
            ..InfoSubject::default()
        };
        let msg = format_info(&subject, -1, &InfoCategory::Skill, &settings()).unwrap();
        assert!(msg.lines[0].contains("forgot"));
    }

    #[test]
    fn custom_text_is_shown_as_written() {
        let category = InfoCategory::Custom("_SE[Bell]Door _name opened".into());
        let msg = format_info(&InfoSubject::default(), 0, &category, &settings()).unwrap();
        assert_eq!(msg.sound.unwrap().name, "Bell");
        assert_eq!(msg.lines, vec!["Door _name opened"]);
    }

    #[test]
    fn malformed_sound_prefix_is_left_alone() {
        assert_eq!(take_sound_prefix("_SE[unclosed"), (None, "_SE[unclosed"));
        assert_eq!(take_sound_prefix("plain"), (None, "plain"));
    }

    #[test]
    fn grow_up_layout_sits_on_the_bottom_edge() {
        let panel = solid_image(816, 56);
        let desc = info_descriptor(panel, None, &settings(), Vec2::new(816.0, 624.0));
        assert_eq!(desc.pattern, Pattern::GrowUp);
        assert_eq!(desc.position, Vec2::new(0.0, 624.0));
        assert_eq!(desc.anchor, Vec2::new(0.0, 1.0));
        assert_eq!(desc.move_offset, Vec2::ZERO);
        assert!(!desc.fixed);
        assert_eq!(desc.duration, 120);
        assert_eq!(desc.slide_count, Some(60));
        assert_eq!(desc.extend, Some(Breakpoints::new(20.0, 100.0)));
    }

    #[test]
    fn short_count_pulls_breakpoints_inside_the_duration() {
        let mut s = settings();
        s.count = 60;
        let desc = info_descriptor(solid_image(816, 28), None, &s, Vec2::new(816.0, 624.0));
        assert_eq!(desc.extend, Some(Breakpoints::new(20.0, 60.0)));
        assert!(desc.validate().is_ok());

        s.count = 10;
        let desc = info_descriptor(solid_image(816, 28), None, &s, Vec2::new(816.0, 624.0));
        assert_eq!(desc.extend, Some(Breakpoints::new(10.0, 10.0)));
        assert!(desc.validate().is_ok());
    }

    #[test]
    fn normal_layout_slides_in_from_the_left() {
        let mut s = settings();
        s.pattern = InfoPattern::Normal;
        s.sup_y = -4.0;
        let desc = info_descriptor(solid_image(816, 28), None, &s, Vec2::new(816.0, 624.0));
        assert_eq!(desc.position, Vec2::new(-816.0, 592.0));
        assert_eq!(desc.move_offset, Vec2::new(816.0, 0.0));
        assert_eq!(desc.anchor, Vec2::ZERO);
    }

    #[test]
    fn up_position_moves_to_top() {
        let mut s = settings();
        s.position = InfoPosition::Up;
        let desc = info_descriptor(solid_image(816, 28), None, &s, Vec2::new(816.0, 624.0));
        assert_eq!(desc.position.y, 28.0);

        s.pattern = InfoPattern::Stretch;
        let desc = info_descriptor(solid_image(816, 28), None, &s, Vec2::new(816.0, 624.0));
        assert_eq!(desc.position.y, 0.0);
    }
}
