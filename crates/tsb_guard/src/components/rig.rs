//! RigComponent: character with a resolved root part and humanoid.
//!
//! Lifecycle:
//! 1. `resolve_rig` ждёт HumanoidRootPart, затем Humanoid (bounded wait)
//! 2. `RigComponent::new` подписывает self-destroy на Died + Destroying
//! 3. Animator опционален: `watch_animator` ждёт дольше и только предупреждает

use std::rc::Rc;

use bevy::math::Vec3;

use super::base::BaseComponent;
use crate::error::RigError;
use crate::host::{Animator, Character, Humanoid, Part, ANIMATOR_NAME};
use crate::lifecycle::{DisposalBag, Scheduler};
use crate::logger;

/// Required sub-parts of a spawned character.
#[derive(Debug, Clone)]
pub struct RigParts {
    pub root: Rc<Part>,
    pub humanoid: Rc<Humanoid>,
}

/// Resolves root part and humanoid, each within `timeout` seconds.
///
/// `on_done` runs exactly once unless the returned bag is destroyed first
/// (then it never runs). May run before this function returns when both
/// parts are already present. The bag is destroyed once `on_done` runs.
pub fn resolve_rig(
    character: &Rc<Character>,
    scheduler: &Scheduler,
    timeout: f32,
    on_done: impl FnOnce(Result<RigParts, RigError>) + 'static,
) -> DisposalBag {
    let pending = DisposalBag::new();
    let pending_weak = pending.downgrade();
    let on_done = {
        let pending = pending.downgrade();
        move |result: Result<RigParts, RigError>| {
            pending.destroy();
            on_done(result);
        }
    };
    let next_character = character.clone();
    let next_scheduler = scheduler.clone();

    let root_wait = character.root.wait(scheduler, Some(timeout), move |root| {
        let Some(root) = root else {
            on_done(Err(missing_part(&next_character, next_character.root.name(), timeout)));
            return;
        };

        let humanoid_wait = next_character.humanoid.wait(&next_scheduler, Some(timeout), {
            let character = next_character.clone();
            move |humanoid| match humanoid {
                Some(humanoid) => on_done(Ok(RigParts { root, humanoid })),
                None => on_done(Err(missing_part(&character, character.humanoid.name(), timeout))),
            }
        });
        pending_weak.add(humanoid_wait);
    });
    pending.add(root_wait);

    pending
}

fn missing_part(character: &Character, part: &'static str, timeout: f32) -> RigError {
    RigError::MissingPart {
        character: character.name().to_string(),
        part,
        timeout,
    }
}

#[derive(Debug)]
pub struct RigComponent {
    base: BaseComponent<Rc<Character>>,
    root: Rc<Part>,
    humanoid: Rc<Humanoid>,
}

impl RigComponent {
    pub fn new(character: Rc<Character>, parts: RigParts) -> Self {
        let base = BaseComponent::new(character.clone());
        let bag = base.bag();
        let weak = bag.downgrade();

        // Died и Destroying часто приходят в одном кадре: destroy идемпотентен
        bag.batch([
            parts.humanoid.died.connect({
                let weak = weak.clone();
                move |_| weak.destroy()
            }),
            character.destroying.connect(move |_| weak.destroy()),
        ]);

        Self {
            base,
            root: parts.root,
            humanoid: parts.humanoid,
        }
    }

    pub fn character(&self) -> &Rc<Character> {
        self.base.instance()
    }

    pub fn root(&self) -> &Rc<Part> {
        &self.root
    }

    pub fn humanoid(&self) -> &Rc<Humanoid> {
        &self.humanoid
    }

    pub fn position(&self) -> Vec3 {
        self.root.position()
    }

    pub fn bag(&self) -> &DisposalBag {
        self.base.bag()
    }

    pub fn destroy(&self) {
        self.base.destroy();
    }

    pub fn is_destroyed(&self) -> bool {
        self.base.is_destroyed()
    }

    /// Waits for the optional animator. Absence is logged, not an error: the
    /// caller just never gets `on_found`.
    pub fn watch_animator(
        &self,
        scheduler: &Scheduler,
        timeout: f32,
        on_found: impl FnOnce(Rc<Animator>) + 'static,
    ) {
        let name = self.character().name().to_string();
        let wait = self.humanoid.animator.wait(scheduler, Some(timeout), move |animator| match animator {
            Some(animator) => on_found(animator),
            None => logger::log_warning(&format!(
                "⚠️ {} not found on '{}' after {:.1}s: dash detection disabled",
                ANIMATOR_NAME, name, timeout
            )),
        });
        self.bag().add(wait);
    }
}
