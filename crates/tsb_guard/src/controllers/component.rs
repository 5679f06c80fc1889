//! ComponentController: roster → PlayerComponent lifecycle.

use std::rc::Rc;

use super::GuardContext;
use crate::components::PlayerComponent;
use crate::host::{Player, PlayerService};
use crate::lifecycle::DisposalBag;
use crate::logger;

pub struct ComponentController;

impl ComponentController {
    /// Creates components for the current roster (next tick) and every
    /// later join; destroys them on leave and when the bag is destroyed.
    /// The local player is the agent and never gets a component.
    pub fn init(ctx: &Rc<GuardContext>, players: &PlayerService) -> DisposalBag {
        let bag = DisposalBag::new();
        let local = players.local_player().map(|player| player.id());

        for player in players.players() {
            if Some(player.id()) == local {
                continue;
            }
            let weak = Rc::downgrade(ctx);
            bag.add(ctx.scheduler.defer(move || {
                if let Some(ctx) = weak.upgrade() {
                    // Мог выйти до следующего тика
                    if player.is_in_game() && ctx.player_component(player.id()).is_none() {
                        on_player_added(&ctx, player);
                    }
                }
            }));
        }

        bag.batch([
            players.player_added.connect({
                let weak = Rc::downgrade(ctx);
                move |player| {
                    if Some(player.id()) == local {
                        return;
                    }
                    if let Some(ctx) = weak.upgrade() {
                        on_player_added(&ctx, player.clone());
                    }
                }
            }),
            players.player_removing.connect({
                let weak = Rc::downgrade(ctx);
                move |player| {
                    if let Some(ctx) = weak.upgrade() {
                        on_player_removing(&ctx, player);
                    }
                }
            }),
        ]);

        bag.add_fn({
            let weak = Rc::downgrade(ctx);
            move || {
                if let Some(ctx) = weak.upgrade() {
                    ctx.destroy_players();
                }
            }
        });

        bag
    }
}

fn on_player_added(ctx: &Rc<GuardContext>, player: Rc<Player>) {
    logger::log(&format!("➕ Player joined: '{}' ({:?})", player.name(), player.id()));
    PlayerComponent::spawn(ctx, player);
}

fn on_player_removing(ctx: &GuardContext, player: &Player) {
    let Some(component) = ctx.player_component(player.id()) else {
        return;
    };
    logger::log(&format!("➖ Player leaving: '{}' ({:?})", player.name(), player.id()));
    component.destroy();
}
