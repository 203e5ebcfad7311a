//! The pop-up scheduler: admission, per-frame animation, stacking and reaping.
//!
//! One [`PopupSystem`] owns the slot table, the ready queue and the stack layout. Hosts
//! call [`PopupSystem::tick`] once per rendered frame; it runs, in order:
//!
//! 1. note the slots that finished last frame,
//! 2. count down delays and activate pop-ups whose delay ran out,
//! 3. animate visible pop-ups, flagging those with no frames left,
//! 4. recompute stack offsets and age the stack,
//! 5. release the slots noted in step 1,
//! 6. poll the ready queue and promote at most one pop-up whose background is loaded.

use std::collections::{HashMap, VecDeque};
use std::fmt;

use log::{debug, info, warn};

use crate::animations::AnimationTable;
use crate::animator::{self, FrameState, Transform};
use crate::color::Color;
use crate::command::Command;
use crate::config::{InfoSection, PopupConfig};
use crate::content::{build_content, render_info_panel};
use crate::descriptor::{self, Pattern, PopupDescriptor, SlideDirection};
use crate::error::{PopupError, Result};
use crate::host::{
    AssetProvider, AssetState, AudioSink, BackgroundSource, Collaborators, ImageHandle, RenderSink, SceneView,
    TextRenderer, Vec2,
};
use crate::information::{format_info, info_descriptor, InfoCategory, InfoSubject};
use crate::slots::SlotTable;
use crate::stack::StackLayout;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct PopupId(pub u64);

impl fmt::Display for PopupId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "popup#{}", self.0)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PopupStatus {
    /// Waiting in the ready queue for its background image.
    Queued,
    /// In a slot, counting down its delay.
    Delayed,
    Visible,
    /// Out of frames; released on the next tick.
    Terminating,
    /// Released, dropped, or never known.
    Gone,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Phase {
    Delayed,
    Visible,
    Terminating,
}

struct ActivePopup {
    id: PopupId,
    desc: PopupDescriptor,
    background: Option<ImageHandle>,
    phase: Phase,
    remaining: u32,
    content: Option<ImageHandle>,
    transform: Transform,
    /// Signed vertical displacement from stacking.
    stack_offset: f64,
    grow_rate: f64,
}

impl ActivePopup {
    fn new(id: PopupId, desc: PopupDescriptor, background: Option<ImageHandle>) -> Self {
        let transform = Transform::at(desc.position);
        ActivePopup {
            id,
            desc,
            background,
            phase: Phase::Delayed,
            remaining: 0,
            content: None,
            transform,
            stack_offset: 0.0,
            grow_rate: 0.0,
        }
    }
}

struct QueuedPopup {
    id: PopupId,
    desc: PopupDescriptor,
    source: BackgroundSource,
    state: AssetState,
}

pub struct PopupSystem {
    slots: SlotTable<ActivePopup>,
    queue: VecDeque<QueuedPopup>,
    stack: StackLayout,
    animations: AnimationTable,
    assets: Box<dyn AssetProvider>,
    text: Box<dyn TextRenderer>,
    audio: Box<dyn AudioSink>,
    scene: Box<dyn SceneView>,
    back_color: Color,
    screen: Vec2,
    info: InfoSection,
    last_info: Option<PopupId>,
    next_id: u64,
    frame: u64,
}

impl PopupSystem {
    pub fn new(config: &PopupConfig, collaborators: Collaborators, animations: AnimationTable) -> Self {
        let Collaborators {
            assets,
            text,
            audio,
            scene,
        } = collaborators;
        PopupSystem {
            slots: SlotTable::with_capacity(config.popup.initial_slots),
            queue: VecDeque::new(),
            stack: StackLayout::new(),
            animations,
            assets,
            text,
            audio,
            scene,
            back_color: config.popup.text_back_color,
            screen: Vec2::new(config.popup.screen_width as f64, config.popup.screen_height as f64),
            info: config.info.clone(),
            last_info: None,
            next_id: 1,
            frame: 0,
        }
    }

    // ── Admission ───────────────────────────────────────────

    /// Admit a pop-up. Pop-ups with an image background wait in the ready queue until the
    /// image is loaded; everything else takes a slot immediately.
    pub fn submit(&mut self, desc: PopupDescriptor) -> Result<PopupId> {
        desc.validate()?;
        if let Pattern::AnimationIndex(index) = desc.pattern {
            if !self.animations.contains(index) {
                return Err(PopupError::UnknownAnimation(index));
            }
        }

        let id = PopupId(self.next_id);
        self.next_id += 1;

        match desc.background.source() {
            Some(source) => {
                let state = self.assets.poll(&source);
                if let AssetState::Failed(reason) = &state {
                    return Err(PopupError::Asset(format!("{source:?}: {reason}")));
                }
                debug!("{id} queued for background {source:?}");
                self.queue.push_back(QueuedPopup { id, desc, source, state });
            }
            None => {
                let slot = self.slots.insert(ActivePopup::new(id, desc, None));
                debug!("{id} admitted to slot {slot}");
            }
        }
        Ok(id)
    }

    /// Resolve `key:value` tokens against the current scene and submit the result.
    pub fn submit_tokens(&mut self, tokens: &[&str]) -> Result<PopupId> {
        let desc = descriptor::resolve(tokens, self.scene.as_ref())?;
        self.submit(desc)
    }

    /// Apply a parsed command. Returns the new pop-up's id, if one was created.
    pub fn execute(&mut self, command: &Command) -> Result<Option<PopupId>> {
        match command {
            Command::Add(_) => self.submit_tokens(&command.tokens()).map(Some),
            Command::Clear(tag) => {
                self.clear(tag.as_deref());
                Ok(None)
            }
            Command::ShowInfo(text) => self.show_info(&InfoSubject::default(), 0, &InfoCategory::Custom(text.clone())),
            Command::Reset => {
                self.reset();
                Ok(None)
            }
        }
    }

    /// Show a gain/loss notification. Chains behind the previous notification while that
    /// one is still on screen.
    pub fn show_info(&mut self, subject: &InfoSubject, delta: i64, category: &InfoCategory) -> Result<Option<PopupId>> {
        if !self.info.enabled {
            return Ok(None);
        }
        let Some(message) = format_info(subject, delta, category, &self.info) else {
            return Ok(None);
        };

        let panel = render_info_panel(
            &message.lines,
            self.screen.x as u32,
            self.info.width,
            self.info.font_size,
            self.text.as_ref(),
        )?;
        let mut desc = info_descriptor(panel, message.sound, &self.info, self.screen);

        let previous_alive = self
            .last_info
            .is_some_and(|last| self.slots.iter().any(|(_, popup)| popup.id == last));
        if previous_alive {
            let longest = self.slots.iter().map(|(_, popup)| popup.desc.delay).max().unwrap_or(0);
            desc.delay = longest + self.info.delay;
        }

        let id = self.submit(desc)?;
        self.last_info = Some(id);
        Ok(Some(id))
    }

    // ── Cancellation ────────────────────────────────────────

    /// Cut short every pop-up in a slot (or only those tagged `tag`) so they end on the
    /// next tick. Queued pop-ups are untouched.
    pub fn clear(&mut self, tag: Option<&str>) {
        let mut cleared = 0;
        for (_, popup) in self.slots.iter_mut() {
            if tag.is_some_and(|tag| popup.desc.tag.as_deref() != Some(tag)) {
                continue;
            }
            match popup.phase {
                Phase::Delayed => {
                    popup.desc.delay = 0;
                    popup.desc.duration = 1;
                }
                Phase::Visible => popup.remaining = 1,
                Phase::Terminating => continue,
            }
            cleared += 1;
        }
        if cleared > 0 {
            debug!("Cleared {cleared} popups (tag {tag:?})");
        }
    }

    /// Drop everything at once, for scene changes.
    pub fn reset(&mut self) {
        info!("Resetting popups: {} active, {} queued", self.slots.len(), self.queue.len());
        self.slots.clear();
        self.queue.clear();
        self.stack.clear();
        self.last_info = None;
    }

    // ── Frame update ────────────────────────────────────────

    pub fn tick(&mut self) {
        self.frame += 1;

        let reap: Vec<usize> = self
            .slots
            .iter()
            .filter(|(_, popup)| popup.phase == Phase::Terminating)
            .map(|(slot, _)| slot)
            .collect();

        self.advance_delays();
        self.animate();
        self.layout_stack();

        for slot in reap {
            if let Some(popup) = self.slots.release(slot) {
                debug!("{} released slot {slot}", popup.id);
            }
        }

        self.promote_ready();
    }

    fn advance_delays(&mut self) {
        let mut due = Vec::new();
        for (slot, popup) in self.slots.iter_mut() {
            if popup.phase != Phase::Delayed {
                continue;
            }
            if popup.desc.delay == 0 {
                due.push(slot);
            } else {
                popup.desc.delay -= 1;
            }
        }
        for slot in due {
            self.activate(slot);
        }
    }

    fn activate(&mut self, slot: usize) {
        let Some(popup) = self.slots.get_mut(slot) else {
            return;
        };
        let content = match build_content(&popup.desc, popup.background.as_ref(), self.text.as_ref(), self.back_color) {
            Ok(content) => content,
            Err(e) => {
                warn!("{} dropped: {e}", popup.id);
                popup.phase = Phase::Terminating;
                return;
            }
        };

        popup.remaining = popup.desc.duration;
        popup.transform = animator::animate(
            &popup.desc,
            popup.remaining,
            &self.animations,
            self.scene.as_ref(),
            &Transform::at(popup.desc.position),
        );
        popup.phase = Phase::Visible;
        if let Some(cue) = &popup.desc.sound {
            self.audio.play(cue);
        }
        if let Some(slide_count) = popup.desc.slide_count {
            self.stack.push(slot, content.height() as f64, slide_count);
        }
        debug!("{} visible in slot {slot} for {} frames", popup.id, popup.remaining);
        popup.content = Some(content);
    }

    fn animate(&mut self) {
        let mut finished = Vec::new();
        for (slot, popup) in self.slots.iter_mut() {
            if popup.phase != Phase::Visible {
                continue;
            }
            popup.remaining = popup.remaining.saturating_sub(1);
            popup.transform = animator::animate(
                &popup.desc,
                popup.remaining,
                &self.animations,
                self.scene.as_ref(),
                &popup.transform,
            );
            if popup.desc.pattern == Pattern::GrowUp {
                popup.grow_rate = popup.transform.scale_y;
            }
            if popup.remaining == 0 {
                popup.phase = Phase::Terminating;
                finished.push(slot);
            }
        }
        for slot in finished {
            self.stack.remove(slot);
        }
    }

    fn layout_stack(&mut self) {
        let rates: HashMap<usize, f64> = self
            .slots
            .iter()
            .filter(|(_, popup)| popup.desc.pattern == Pattern::GrowUp && popup.phase == Phase::Visible)
            .map(|(slot, popup)| (slot, popup.grow_rate))
            .collect();

        for (slot, popup) in self.slots.iter_mut() {
            let Some(slide_count) = popup.desc.slide_count else {
                continue;
            };
            if popup.phase != Phase::Visible {
                continue;
            }
            let magnitude = self.stack.offset_for(slot, slide_count, |other| rates.get(&other).copied());
            popup.stack_offset = match popup.desc.slide_direction {
                SlideDirection::Up => -magnitude,
                SlideDirection::Down => magnitude,
            };
        }
        self.stack.advance();
    }

    fn promote_ready(&mut self) {
        for queued in self.queue.iter_mut() {
            if matches!(queued.state, AssetState::Pending) {
                queued.state = self.assets.poll(&queued.source);
            }
        }

        self.queue.retain(|queued| match &queued.state {
            AssetState::Failed(reason) => {
                warn!("{} dropped, background {:?} failed: {reason}", queued.id, queued.source);
                false
            }
            _ => true,
        });

        let Some(index) = self
            .queue
            .iter()
            .position(|queued| matches!(queued.state, AssetState::Ready(_)))
        else {
            return;
        };
        let Some(queued) = self.queue.remove(index) else {
            return;
        };
        let AssetState::Ready(image) = queued.state else {
            return;
        };
        let slot = self.slots.insert(ActivePopup::new(queued.id, queued.desc, Some(image)));
        debug!("{} promoted from ready queue to slot {slot}", queued.id);
    }

    // ── Queries ─────────────────────────────────────────────

    pub fn status(&self, id: PopupId) -> PopupStatus {
        if self.queue.iter().any(|queued| queued.id == id) {
            return PopupStatus::Queued;
        }
        match self.find(id).map(|popup| popup.phase) {
            Some(Phase::Delayed) => PopupStatus::Delayed,
            Some(Phase::Visible) => PopupStatus::Visible,
            Some(Phase::Terminating) => PopupStatus::Terminating,
            None => PopupStatus::Gone,
        }
    }

    /// Frames left for a visible pop-up.
    pub fn remaining(&self, id: PopupId) -> Option<u32> {
        self.find(id)
            .filter(|popup| popup.phase != Phase::Delayed)
            .map(|popup| popup.remaining)
    }

    /// Current signed stack displacement of a pop-up.
    pub fn stack_offset(&self, id: PopupId) -> Option<f64> {
        self.find(id).map(|popup| popup.stack_offset)
    }

    /// What to draw for `id` this frame; `None` until it has content.
    pub fn frame_state(&self, id: PopupId) -> Option<FrameState> {
        self.find(id).and_then(frame_of)
    }

    /// Frame states of every drawable pop-up, in slot order.
    pub fn frame_states(&self) -> Vec<FrameState> {
        self.slots.iter().filter_map(|(_, popup)| frame_of(popup)).collect()
    }

    pub fn present(&self, sink: &mut dyn RenderSink) {
        sink.present(&self.frame_states());
    }

    pub fn active_count(&self) -> usize {
        self.slots.len()
    }

    pub fn queued_count(&self) -> usize {
        self.queue.len()
    }

    pub fn slot_capacity(&self) -> usize {
        self.slots.capacity()
    }

    pub fn frame(&self) -> u64 {
        self.frame
    }

    pub fn is_idle(&self) -> bool {
        self.slots.is_empty() && self.queue.is_empty()
    }

    fn find(&self, id: PopupId) -> Option<&ActivePopup> {
        self.slots.iter().map(|(_, popup)| popup).find(|popup| popup.id == id)
    }
}

fn frame_of(popup: &ActivePopup) -> Option<FrameState> {
    if popup.phase == Phase::Delayed {
        return None;
    }
    let content = popup.content.clone()?;
    let mut transform = popup.transform;
    transform.y += popup.stack_offset;
    Some(FrameState {
        id: popup.id,
        transform,
        anchor: popup.desc.anchor,
        content,
    })
}
