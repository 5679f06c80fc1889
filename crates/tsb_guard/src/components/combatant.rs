//! CombatantComponent: per-character block timing state machine.
//!
//! Реагирует на два внешних сигнала:
//! - attack fired → `on_normal_attack` (timed block по таблице архетипа)
//! - animation played → dash tag → `on_dash_attack` (block пока в радиусе)
//!
//! Без архетипа (base variant) только следит за combo stage.

use std::cell::{Cell, RefCell};
use std::rc::{Rc, Weak};

use super::archetype::{Archetype, ArchetypeProfile};
use super::rig::RigComponent;
use crate::controllers::GuardContext;
use crate::host::{AnimationTrack, AttributeValue, COMBO_ATTRIBUTE};
use crate::lifecycle::{DisposalBag, TaskHandle};
use crate::logger;

/// Identity of a combatant inside the block request set.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct CombatantId(pub u64);

#[derive(Debug)]
pub struct CombatantComponent {
    id: CombatantId,
    rig: RigComponent,
    archetype: Option<Archetype>,
    profile: Option<ArchetypeProfile>,
    ctx: Weak<GuardContext>,
    combo_stage: Cell<i32>,
    /// Dash proximity loop already subscribed to heartbeat
    dash_tracking: Cell<bool>,
    in_dash_range: Cell<bool>,
    block_timer: RefCell<Option<TaskHandle>>,
}

impl CombatantComponent {
    /// Wraps a resolved rig and wires all subscriptions into the rig's bag.
    pub fn spawn(ctx: &Rc<GuardContext>, rig: RigComponent, archetype: Option<Archetype>) -> Rc<Self> {
        let this = Rc::new(Self {
            id: ctx.next_combatant_id(),
            rig,
            archetype,
            profile: archetype.map(|a| a.profile()),
            ctx: Rc::downgrade(ctx),
            combo_stage: Cell::new(0),
            dash_tracking: Cell::new(false),
            in_dash_range: Cell::new(false),
            block_timer: RefCell::new(None),
        });

        let character = this.rig.character().clone();
        this.on_combo_changed(character.attributes.get(COMBO_ATTRIBUTE).as_ref());

        let weak = Rc::downgrade(&this);
        let bag = this.bag();

        // Снимаем свой block request при любом teardown (смерть посреди dash)
        bag.add_fn({
            let ctx = Rc::downgrade(ctx);
            let id = this.id;
            move || {
                if let Some(ctx) = ctx.upgrade() {
                    ctx.counter.remove_block(id);
                }
            }
        });
        bag.add_fn({
            let weak = weak.clone();
            move || {
                if let Some(this) = weak.upgrade() {
                    this.cancel_block_timer();
                }
            }
        });

        bag.batch([
            character.attributes.on_changed(COMBO_ATTRIBUTE, {
                let weak = weak.clone();
                move |value| {
                    if let Some(this) = weak.upgrade() {
                        this.on_combo_changed(value);
                    }
                }
            }),
            character.attack_fired.connect({
                let weak = weak.clone();
                move |_| {
                    if let Some(this) = weak.upgrade() {
                        this.on_normal_attack();
                    }
                }
            }),
        ]);

        if this.profile.is_some() {
            this.rig.watch_animator(&ctx.scheduler, ctx.config.animator_timeout, move |animator| {
                let Some(this) = weak.upgrade() else {
                    return;
                };
                let connection = animator.played.connect({
                    let weak = weak.clone();
                    move |track| {
                        if let Some(this) = weak.upgrade() {
                            this.on_animation_played(track);
                        }
                    }
                });
                this.bag().add(connection);
            });
        }

        logger::log(&format!(
            "🥊 Combatant {:?} spawned for '{}' ({})",
            this.id,
            character.name(),
            this.archetype.map(|a| a.tag()).unwrap_or("base")
        ));

        this
    }

    pub fn id(&self) -> CombatantId {
        self.id
    }

    pub fn archetype(&self) -> Option<Archetype> {
        self.archetype
    }

    pub fn profile(&self) -> Option<&ArchetypeProfile> {
        self.profile.as_ref()
    }

    pub fn combo_stage(&self) -> i32 {
        self.combo_stage.get()
    }

    pub fn rig(&self) -> &RigComponent {
        &self.rig
    }

    pub fn bag(&self) -> &DisposalBag {
        self.rig.bag()
    }

    pub fn is_dash_tracking(&self) -> bool {
        self.dash_tracking.get()
    }

    pub fn is_in_dash_range(&self) -> bool {
        self.in_dash_range.get()
    }

    pub fn destroy(&self) {
        self.rig.destroy();
    }

    pub fn is_destroyed(&self) -> bool {
        self.rig.is_destroyed()
    }

    /// Recomputes the stage; a missing or non-numeric value keeps the old one.
    pub fn on_combo_changed(&self, value: Option<&AttributeValue>) {
        let Some(combo) = value.and_then(AttributeValue::as_number) else {
            return;
        };
        let offset = self.ctx.upgrade().map(|ctx| ctx.config.combo_offset).unwrap_or(2);
        // `as` насыщает, вычитание тоже
        self.combo_stage.set((combo as i32).saturating_sub(offset));
    }

    /// Attack fired: timed block when the attacker is close enough.
    pub fn on_normal_attack(&self) {
        let Some(profile) = self.profile else {
            return;
        };
        let Some(ctx) = self.ctx.upgrade() else {
            return;
        };
        let Some(distance) = ctx.agent.distance_to(self.rig.position()) else {
            return;
        };
        if distance >= ctx.config.normal_block_range {
            return;
        }

        let duration = profile.block_duration(self.combo_stage.get());
        logger::log(&format!(
            "🛡️ {:?} attack at {:.1} (stage {}) → block {:.2}s",
            self.id,
            distance,
            self.combo_stage.get(),
            duration
        ));

        // Новый block перекрывает старый таймер того же атакующего
        self.cancel_block_timer();
        let timer = ctx.counter.block(self.id, duration);
        *self.block_timer.borrow_mut() = Some(timer);
    }

    fn cancel_block_timer(&self) {
        let previous = self.block_timer.borrow_mut().take();
        if let Some(previous) = previous {
            previous.cancel();
        }
    }

    pub fn on_animation_played(self: &Rc<Self>, track: &AnimationTrack) {
        let Some(profile) = self.profile else {
            return;
        };
        if profile.is_dash(&track.animation_id) {
            self.on_dash_attack();
        }
    }

    /// Starts the per-frame proximity loop (once per component).
    ///
    /// Edge-triggered: entering range → `add_block`, leaving → `remove_block`.
    pub fn on_dash_attack(self: &Rc<Self>) {
        if self.dash_tracking.replace(true) {
            return;
        }
        let Some(ctx) = self.ctx.upgrade() else {
            return;
        };
        logger::log(&format!("💨 {:?} dash detected → tracking range", self.id));

        let weak = Rc::downgrade(self);
        let connection = ctx.scheduler.heartbeat().connect(move |_| {
            if let Some(this) = weak.upgrade() {
                this.track_dash_range();
            }
        });
        self.bag().add(connection);
    }

    fn track_dash_range(&self) {
        let Some(ctx) = self.ctx.upgrade() else {
            return;
        };
        let in_range = ctx
            .agent
            .distance_to(self.rig.position())
            .is_some_and(|distance| distance < ctx.config.dash_block_range);

        if in_range == self.in_dash_range.replace(in_range) {
            return;
        }
        if in_range {
            ctx.counter.add_block(self.id);
        } else {
            ctx.counter.remove_block(self.id);
        }
    }
}
