//! PlayerComponent: owns at most one live CombatantComponent.
//!
//! Character respawn = старый combatant уничтожается ДО создания нового.
//! Пока rig резолвится, в слоте лежит pending wait (отменяется так же).

use std::cell::{Cell, RefCell};
use std::rc::{Rc, Weak};

use super::archetype::Archetype;
use super::base::BaseComponent;
use super::combatant::CombatantComponent;
use super::rig::{resolve_rig, RigComponent};
use crate::controllers::GuardContext;
use crate::host::{AttributeValue, Character, Player, ARCHETYPE_ATTRIBUTE};
use crate::lifecycle::DisposalBag;
use crate::logger;

/// Archetype from the player attribute: absent → `fallback`, unknown tag → base.
pub fn read_archetype(value: Option<&AttributeValue>, fallback: Option<Archetype>) -> Option<Archetype> {
    match value {
        None => fallback,
        Some(value) => value.as_text().and_then(Archetype::from_tag),
    }
}

#[derive(Debug)]
pub struct PlayerComponent {
    base: BaseComponent<Rc<Player>>,
    ctx: Weak<GuardContext>,
    archetype: Cell<Option<Archetype>>,
    character: RefCell<Option<Rc<CombatantComponent>>>,
    pending: RefCell<Option<DisposalBag>>,
}

impl PlayerComponent {
    /// Creates the component and registers it in the context's player registry.
    pub fn spawn(ctx: &Rc<GuardContext>, player: Rc<Player>) -> Rc<Self> {
        let archetype = read_archetype(
            player.attributes.get(ARCHETYPE_ATTRIBUTE).as_ref(),
            ctx.config.default_archetype,
        );

        let this = Rc::new(Self {
            base: BaseComponent::new(player.clone()),
            ctx: Rc::downgrade(ctx),
            archetype: Cell::new(archetype),
            character: RefCell::new(None),
            pending: RefCell::new(None),
        });
        let weak = Rc::downgrade(&this);
        let bag = this.base.bag();

        if let Some(character) = player.character() {
            bag.add(ctx.scheduler.defer({
                let weak = weak.clone();
                move || {
                    if let Some(this) = weak.upgrade() {
                        this.on_character_added(character);
                    }
                }
            }));
        }

        bag.batch([
            player.character_added.connect({
                let weak = weak.clone();
                move |character| {
                    if let Some(this) = weak.upgrade() {
                        this.on_character_added(character.clone());
                    }
                }
            }),
            player.character_removing.connect({
                let weak = weak.clone();
                move |_| {
                    if let Some(this) = weak.upgrade() {
                        this.on_character_removing();
                    }
                }
            }),
            player.attributes.on_changed(ARCHETYPE_ATTRIBUTE, {
                let weak = weak.clone();
                move |value| {
                    if let Some(this) = weak.upgrade() {
                        this.on_archetype_changed(value);
                    }
                }
            }),
        ]);

        bag.add_fn({
            let weak = weak.clone();
            move || {
                if let Some(this) = weak.upgrade() {
                    this.clear_character();
                }
            }
        });

        // Снимаем себя из registry, только если там всё ещё мы
        bag.add_fn({
            let ctx = Rc::downgrade(ctx);
            let id = player.id();
            move || {
                if let Some(ctx) = ctx.upgrade() {
                    ctx.unregister_player(id, weak.as_ptr());
                }
            }
        });

        ctx.register_player(player.id(), this.clone());
        logger::log(&format!(
            "👤 PlayerComponent for '{}' ({})",
            player.name(),
            archetype.map(|a| a.tag()).unwrap_or("base")
        ));

        this
    }

    pub fn player(&self) -> &Rc<Player> {
        self.base.instance()
    }

    pub fn archetype(&self) -> Option<Archetype> {
        self.archetype.get()
    }

    /// Live combatant for the current character, if resolved.
    pub fn character(&self) -> Option<Rc<CombatantComponent>> {
        self.character.borrow().clone()
    }

    pub fn is_resolving(&self) -> bool {
        self.pending
            .borrow()
            .as_ref()
            .is_some_and(|pending| !pending.is_destroyed())
    }

    pub fn destroy(&self) {
        self.base.destroy();
    }

    pub fn is_destroyed(&self) -> bool {
        self.base.is_destroyed()
    }

    pub fn on_character_added(self: &Rc<Self>, character: Rc<Character>) {
        self.clear_character();
        if self.is_destroyed() {
            return;
        }
        let Some(ctx) = self.ctx.upgrade() else {
            return;
        };

        let archetype = self.archetype.get();
        let weak = Rc::downgrade(self);
        let model = character.clone();

        let pending = resolve_rig(&character, &ctx.scheduler, ctx.config.rig_part_timeout, move |result| {
            let Some(this) = weak.upgrade() else {
                return;
            };
            let Some(ctx) = this.ctx.upgrade() else {
                return;
            };
            match result {
                Ok(parts) => {
                    let rig = RigComponent::new(model, parts);
                    let combatant = CombatantComponent::spawn(&ctx, rig, archetype);
                    // Died / Destroying уничтожают combatant сами → чистим слот
                    combatant.bag().add_fn({
                        let weak = Rc::downgrade(&this);
                        let combatant = Rc::downgrade(&combatant);
                        move || {
                            if let Some(this) = weak.upgrade() {
                                this.forget_character(&combatant);
                            }
                        }
                    });
                    *this.character.borrow_mut() = Some(combatant);
                }
                Err(error) => {
                    logger::log_error(&format!(
                        "❌ Skipping character for '{}': {}",
                        this.player().name(),
                        error
                    ));
                }
            }
        });

        *self.pending.borrow_mut() = Some(pending);
    }

    pub fn on_character_removing(&self) {
        self.clear_character();
    }

    pub fn on_archetype_changed(&self, value: Option<&AttributeValue>) {
        let archetype = read_archetype(value, self.archetype.get());
        self.archetype.set(archetype);
        logger::log(&format!(
            "🔁 '{}' archetype → {}",
            self.player().name(),
            archetype.map(|a| a.tag()).unwrap_or("base")
        ));
    }

    fn forget_character(&self, combatant: &Weak<CombatantComponent>) {
        let current = {
            let mut slot = self.character.borrow_mut();
            match slot.as_ref() {
                Some(current) if std::ptr::eq(Rc::as_ptr(current), combatant.as_ptr()) => slot.take(),
                _ => None,
            }
        };
        drop(current);
    }

    /// Destroys the pending resolution and the live combatant (in that order).
    fn clear_character(&self) {
        let pending = self.pending.borrow_mut().take();
        if let Some(pending) = pending {
            pending.destroy();
        }
        let character = self.character.borrow_mut().take();
        if let Some(character) = character {
            character.destroy();
        }
    }
}
