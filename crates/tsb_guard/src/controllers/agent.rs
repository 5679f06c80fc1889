//! AgentController: rig of the local player (the one being protected).
//!
//! Все дистанции считаются от root part агента. Пока rig не резолвлен
//! (нет персонажа / респавн), `distance_to` возвращает None и блоков нет.

use std::cell::RefCell;
use std::rc::Rc;

use bevy::math::Vec3;

use crate::components::{resolve_rig, RigComponent};
use crate::host::{planar_distance, Character, Player};
use crate::lifecycle::{DisposalBag, Scheduler};
use crate::logger;

#[derive(Debug, Default)]
pub struct AgentController {
    rig: Rc<RefCell<Option<RigComponent>>>,
    pending: RefCell<Option<DisposalBag>>,
}

impl AgentController {
    pub fn new() -> Self {
        Self::default()
    }

    /// Follows the local player's character. The returned bag owns the
    /// subscriptions and tears the current rig down.
    pub fn init(self: &Rc<Self>, local: &Rc<Player>, scheduler: &Scheduler, timeout: f32) -> DisposalBag {
        let bag = DisposalBag::new();

        if let Some(character) = local.character() {
            self.on_character_added(character, scheduler, timeout);
        }

        bag.batch([
            local.character_added.connect({
                let weak = Rc::downgrade(self);
                let scheduler = scheduler.clone();
                move |character| {
                    if let Some(this) = weak.upgrade() {
                        this.on_character_added(character.clone(), &scheduler, timeout);
                    }
                }
            }),
            local.character_removing.connect({
                let weak = Rc::downgrade(self);
                move |_| {
                    if let Some(this) = weak.upgrade() {
                        this.clear();
                    }
                }
            }),
        ]);

        bag.add_fn({
            let weak = Rc::downgrade(self);
            move || {
                if let Some(this) = weak.upgrade() {
                    this.clear();
                }
            }
        });

        bag
    }

    pub fn on_character_added(&self, character: Rc<Character>, scheduler: &Scheduler, timeout: f32) {
        self.clear();

        let slot = Rc::downgrade(&self.rig);
        let model = character.clone();
        let pending = resolve_rig(&character, scheduler, timeout, move |result| match result {
            Ok(parts) => {
                let Some(slot) = slot.upgrade() else {
                    return;
                };
                logger::log(&format!("🧍 Agent rig ready: '{}'", model.name()));
                *slot.borrow_mut() = Some(RigComponent::new(model, parts));
            }
            Err(error) => logger::log_error(&format!("❌ Agent rig unavailable: {}", error)),
        });
        *self.pending.borrow_mut() = Some(pending);
    }

    pub fn clear(&self) {
        let pending = self.pending.borrow_mut().take();
        if let Some(pending) = pending {
            pending.destroy();
        }
        let rig = self.rig.borrow_mut().take();
        if let Some(rig) = rig {
            rig.destroy();
        }
    }

    /// Root position of a live agent rig.
    pub fn root_position(&self) -> Option<Vec3> {
        self.rig
            .borrow()
            .as_ref()
            .filter(|rig| !rig.is_destroyed())
            .map(RigComponent::position)
    }

    /// Planar distance from the agent root to `position`.
    pub fn distance_to(&self, position: Vec3) -> Option<f32> {
        self.root_position().map(|agent| planar_distance(agent, position))
    }

    pub fn is_ready(&self) -> bool {
        self.root_position().is_some()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::host::{CharacterId, PlayerId};

    #[test]
    fn test_agent_follows_local_character() {
        let scheduler = Scheduler::new();
        let local = Player::new(PlayerId(1), "me");
        let agent = Rc::new(AgentController::new());
        let bag = agent.init(&local, &scheduler, 4.0);
        assert!(!agent.is_ready());

        local.load_character(Character::assembled(CharacterId(1), "me", Vec3::new(0.0, 5.0, 0.0)));
        assert_eq!(agent.distance_to(Vec3::new(6.0, 0.0, 8.0)), Some(10.0));

        local.remove_character();
        assert_eq!(agent.distance_to(Vec3::ZERO), None);

        local.load_character(Character::assembled(CharacterId(2), "me", Vec3::ZERO));
        assert!(agent.is_ready());

        bag.destroy();
        assert!(!agent.is_ready());
        assert_eq!(local.character_added.connection_count(), 0);
    }

    #[test]
    fn test_dead_agent_has_no_position() {
        let scheduler = Scheduler::new();
        let local = Player::new(PlayerId(1), "me");
        let character = Character::assembled(CharacterId(1), "me", Vec3::ZERO);
        local.load_character(character.clone());

        let agent = Rc::new(AgentController::new());
        let _bag = agent.init(&local, &scheduler, 4.0);
        assert!(agent.is_ready());

        if let Some(humanoid) = character.humanoid.get() {
            humanoid.kill();
        }
        assert!(!agent.is_ready());
    }
}
