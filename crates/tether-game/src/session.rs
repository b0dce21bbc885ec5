//! Server and client sessions over the loopback transport
//!
//! The server owns every character with authority. Clients mirror actors under the
//! server's handles, drive their own character from input and send requests; the server
//! answers with deltas, movement snapshots and rejections.

use std::collections::{BTreeMap, HashMap};

use glam::Vec3;
use tether_core::ActorId;
use tether_net::{decode, encode, Delta, DeltaTracker, LoopbackHub, NetRole, PeerId};
use tracing::{debug, info, warn};

use crate::actors::ActorKind;
use crate::character::Character;
use crate::config::CharacterConfig;
use crate::error::GameError;
use crate::input::InputState;
use crate::protocol::{ClientMessage, ServerMessage, ServerRequest};
use crate::scene::Scene;

fn send_to(
    hub: &mut LoopbackHub,
    from: PeerId,
    to: PeerId,
    message: &ServerMessage,
) -> Result<(), GameError> {
    let bytes = encode(message)?;
    hub.send(from, to, bytes)?;
    Ok(())
}

/// Authoritative side
pub struct ServerSession {
    peer: PeerId,
    pub scene: Scene,
    pub config: CharacterConfig,
    characters: BTreeMap<ActorId, Character>,
    /// Character each joined client controls
    owners: HashMap<PeerId, ActorId>,
}

impl ServerSession {
    pub fn new(scene: Scene, config: CharacterConfig) -> Self {
        Self {
            peer: PeerId::new(),
            scene,
            config,
            characters: BTreeMap::new(),
            owners: HashMap::new(),
        }
    }

    pub fn peer(&self) -> PeerId {
        self.peer
    }

    pub fn character(&self, id: ActorId) -> Option<&Character> {
        self.characters.get(&id)
    }

    pub fn character_mut(&mut self, id: ActorId) -> Option<&mut Character> {
        self.characters.get_mut(&id)
    }

    /// Character controlled by `client`
    pub fn player(&self, client: PeerId) -> Option<ActorId> {
        self.owners.get(&client).copied()
    }

    /// Send to every joined client except `skip`
    fn broadcast(&self, hub: &mut LoopbackHub, message: &ServerMessage, skip: Option<PeerId>) {
        let bytes = match encode(message) {
            Ok(bytes) => bytes,
            Err(err) => {
                warn!("Failed to encode broadcast: {}", err);
                return;
            }
        };
        for client in self.owners.keys() {
            if Some(*client) == skip {
                continue;
            }
            if let Err(err) = hub.send(self.peer, *client, bytes.clone()) {
                warn!("Broadcast to {} failed: {}", client, err);
            }
        }
    }

    fn spawn_message(&self, actor: ActorId) -> Option<ServerMessage> {
        self.scene.get(actor).map(|record| ServerMessage::ActorSpawned {
            actor,
            name: record.name.clone(),
            kind: record.kind,
            position: record.position,
        })
    }

    /// Spawn a world actor and announce it
    pub fn spawn_actor(
        &mut self,
        hub: &mut LoopbackHub,
        name: &str,
        kind: ActorKind,
        position: Vec3,
    ) -> ActorId {
        let actor = self.scene.spawn(name, kind, position);
        if let Some(message) = self.spawn_message(actor) {
            self.broadcast(hub, &message, None);
        }
        actor
    }

    /// Remove an actor everywhere. Returns `false` for stale handles.
    pub fn despawn_actor(&mut self, hub: &mut LoopbackHub, actor: ActorId) -> bool {
        let removed = match self.characters.remove(&actor) {
            Some(character) => {
                character.despawn(&mut self.scene);
                self.owners.retain(|_, owned| *owned != actor);
                true
            }
            None => self.scene.despawn(actor),
        };
        if removed {
            self.broadcast(hub, &ServerMessage::ActorDespawned { actor }, None);
        }
        removed
    }

    /// Spawn a character for a connected client and send it the world
    pub fn add_player(
        &mut self,
        hub: &mut LoopbackHub,
        client: PeerId,
        name: &str,
        position: Vec3,
    ) -> Result<ActorId, GameError> {
        let character = Character::spawn(
            &mut self.scene,
            name,
            position,
            NetRole::Authority,
            false,
            self.config.clone(),
        );
        let actor = character.id();
        self.characters.insert(actor, character);
        if let Some(message) = self.spawn_message(actor) {
            self.broadcast(hub, &message, None);
        }
        self.owners.insert(client, actor);
        info!("Client {} joined as {}", client, actor);

        send_to(hub, self.peer, client, &ServerMessage::Welcome { actor })?;
        let world: Vec<ActorId> = self.scene.actors().map(|(id, _)| id).collect();
        for id in world {
            if let Some(message) = self.spawn_message(id) {
                send_to(hub, self.peer, client, &message)?;
            }
        }
        for (id, character) in &self.characters {
            let state = ServerMessage::State {
                actor: *id,
                fields: character.state.snapshot(),
            };
            send_to(hub, self.peer, client, &state)?;
        }
        Ok(actor)
    }

    /// Drop a client and its character
    pub fn remove_player(&mut self, hub: &mut LoopbackHub, client: PeerId) {
        if let Some(actor) = self.owners.remove(&client) {
            info!("Client {} left", client);
            self.despawn_actor(hub, actor);
        }
    }

    /// Validate and run one client request
    pub fn handle_client_message(
        &mut self,
        hub: &mut LoopbackHub,
        from: PeerId,
        message: ClientMessage,
    ) -> Result<(), GameError> {
        if self.owners.get(&from) != Some(&message.actor) {
            return Err(GameError::NotOwner {
                peer: from,
                actor: message.actor,
            });
        }
        let character = self
            .characters
            .get_mut(&message.actor)
            .ok_or(GameError::StaleActor(message.actor))?;
        if let Err(err) = character.handle_request(&message.request, &mut self.scene) {
            warn!("Rejected {:?} from {}: {}", message.request, from, err);
            let rejection = ServerMessage::Rejected {
                actor: message.actor,
                request: message.request,
                reason: err.to_string(),
            };
            send_to(hub, self.peer, from, &rejection)?;
        }
        Ok(())
    }

    fn process_incoming(&mut self, hub: &mut LoopbackHub) {
        while let Some(datagram) = hub.recv(self.peer) {
            let message = match decode::<ClientMessage>(&datagram.bytes) {
                Ok(message) => message,
                Err(err) => {
                    warn!("Undecodable message from {}: {}", datagram.from, err);
                    continue;
                }
            };
            if let Err(err) = self.handle_client_message(hub, datagram.from, message) {
                warn!("Dropped message from {}: {}", datagram.from, err);
            }
        }
    }

    /// One server frame: requests, simulation, then replication
    pub fn tick(&mut self, hub: &mut LoopbackHub, dt: f32) {
        self.process_incoming(hub);
        self.scene.tick();
        for character in self.characters.values_mut() {
            character.tick(&mut self.scene, dt);
        }

        let mut outgoing = Vec::new();
        for (id, character) in self.characters.iter_mut() {
            if let Some(delta) = character.take_delta() {
                outgoing.push(ServerMessage::Delta(delta));
            }
            outgoing.push(ServerMessage::Movement {
                actor: *id,
                snapshot: character.movement_snapshot(),
            });
        }
        for message in &outgoing {
            self.broadcast(hub, message, None);
        }
    }
}

/// Controlling client
pub struct ClientSession {
    peer: PeerId,
    server: PeerId,
    pub scene: Scene,
    pub config: CharacterConfig,
    characters: BTreeMap<ActorId, Character>,
    local: Option<ActorId>,
    tracker: DeltaTracker,
}

impl ClientSession {
    pub fn new(server: PeerId, scene: Scene, config: CharacterConfig) -> Self {
        Self {
            peer: PeerId::new(),
            server,
            scene,
            config,
            characters: BTreeMap::new(),
            local: None,
            tracker: DeltaTracker::new(),
        }
    }

    pub fn peer(&self) -> PeerId {
        self.peer
    }

    /// Handle of the character this client controls, once welcomed
    pub fn local_actor(&self) -> Option<ActorId> {
        self.local
    }

    pub fn local_character(&self) -> Option<&Character> {
        self.local.and_then(|id| self.characters.get(&id))
    }

    pub fn character(&self, id: ActorId) -> Option<&Character> {
        self.characters.get(&id)
    }

    /// Issue a request for the local character outside of input handling
    pub fn request(&mut self, request: ServerRequest) {
        let Some(id) = self.local else {
            return;
        };
        if let Some(character) = self.characters.get_mut(&id) {
            character.request(request, &mut self.scene);
        }
    }

    /// Apply one message from the server
    pub fn handle_server_message(&mut self, message: ServerMessage) -> Result<(), GameError> {
        match message {
            ServerMessage::Welcome { actor } => {
                info!("Controlling {}", actor);
                self.local = Some(actor);
            }
            ServerMessage::ActorSpawned {
                actor,
                name,
                kind,
                position,
            } => {
                if self.scene.is_alive(actor) {
                    return Ok(());
                }
                self.scene.spawn_replicated(actor, name, kind, position)?;
                if kind == ActorKind::Character {
                    let controlled = self.local == Some(actor);
                    let role = if controlled {
                        NetRole::AutonomousProxy
                    } else {
                        NetRole::SimulatedProxy
                    };
                    let character = Character::attach(
                        &mut self.scene,
                        actor,
                        role,
                        controlled,
                        self.config.clone(),
                    )?;
                    self.characters.insert(actor, character);
                }
            }
            ServerMessage::ActorDespawned { actor } => {
                match self.characters.remove(&actor) {
                    Some(character) => character.despawn(&mut self.scene),
                    None => {
                        self.scene.despawn(actor);
                    }
                }
                self.tracker.forget(actor);
                if self.local == Some(actor) {
                    self.local = None;
                }
            }
            ServerMessage::State { actor, fields } => {
                let delta = Delta {
                    actor,
                    sequence: 0,
                    changes: fields,
                };
                match self.characters.get_mut(&actor) {
                    Some(character) => character.apply_delta(&delta, &mut self.scene),
                    None => debug!("State for unknown actor {}", actor),
                }
            }
            ServerMessage::Delta(delta) => {
                if !self.tracker.accept(&delta) {
                    return Ok(());
                }
                match self.characters.get_mut(&delta.actor) {
                    Some(character) => character.apply_delta(&delta, &mut self.scene),
                    None => debug!("Delta for unknown actor {}", delta.actor),
                }
            }
            ServerMessage::Movement { actor, snapshot } => {
                if self.local == Some(actor) {
                    return Ok(());
                }
                if let Some(character) = self.characters.get_mut(&actor) {
                    character.apply_movement(&snapshot, &mut self.scene);
                }
            }
            ServerMessage::Rejected {
                actor,
                request,
                reason,
            } => {
                warn!("Server rejected {:?}: {}", request, reason);
                if let Some(character) = self.characters.get_mut(&actor) {
                    character.handle_rejection(&request, &mut self.scene);
                }
            }
        }
        Ok(())
    }

    fn process_incoming(&mut self, hub: &mut LoopbackHub) {
        while let Some(datagram) = hub.recv(self.peer) {
            let result = decode::<ServerMessage>(&datagram.bytes)
                .map_err(GameError::from)
                .and_then(|message| self.handle_server_message(message));
            if let Err(err) = result {
                warn!("Failed to apply server message: {}", err);
            }
        }
    }

    fn send_requests(&mut self, hub: &mut LoopbackHub) {
        let Some(id) = self.local else {
            return;
        };
        let Some(character) = self.characters.get_mut(&id) else {
            return;
        };
        for request in character.take_requests() {
            let message = ClientMessage { actor: id, request };
            let sent = encode(&message)
                .and_then(|bytes| hub.send(self.peer, self.server, bytes));
            if let Err(err) = sent {
                warn!("Failed to send request: {}", err);
            }
        }
    }

    /// One client frame: server messages, input, simulation, then requests
    pub fn tick(&mut self, hub: &mut LoopbackHub, input: &InputState, dt: f32) {
        self.process_incoming(hub);
        self.scene.tick();
        if let Some(id) = self.local {
            if let Some(character) = self.characters.get_mut(&id) {
                character.handle_input(input, &mut self.scene);
            }
        }
        for character in self.characters.values_mut() {
            character.tick(&mut self.scene, dt);
        }
        self.send_requests(hub);
    }
}
