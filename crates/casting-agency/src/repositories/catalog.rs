//! In-memory movie and actor catalog.
//!
//! Records live in ordered maps keyed by id, so listings come back in
//! insertion order. Ids start at 1, increase by one per insert, and are
//! never reused after a delete.

use crate::models::{Actor, ActorInput, Movie, MovieInput};
use std::collections::BTreeMap;
use tokio::sync::RwLock;
use tracing::instrument;

#[derive(Debug)]
struct Catalog {
    movies: BTreeMap<u64, Movie>,
    actors: BTreeMap<u64, Actor>,
    next_movie_id: u64,
    next_actor_id: u64,
}

impl Default for Catalog {
    fn default() -> Self {
        Self {
            movies: BTreeMap::new(),
            actors: BTreeMap::new(),
            next_movie_id: 1,
            next_actor_id: 1,
        }
    }
}

/// Catalog store shared by all handlers.
#[derive(Debug, Default)]
pub struct CatalogStore {
    inner: RwLock<Catalog>,
}

impl CatalogStore {
    pub fn new() -> Self {
        Self::default()
    }

    // ------------------------------------------------------------------------
    // Movies
    // ------------------------------------------------------------------------

    pub async fn list_movies(&self) -> Vec<Movie> {
        self.inner.read().await.movies.values().cloned().collect()
    }

    pub async fn get_movie(&self, id: u64) -> Option<Movie> {
        self.inner.read().await.movies.get(&id).cloned()
    }

    #[instrument(skip_all, name = "ca.catalog.insert_movie")]
    pub async fn insert_movie(&self, input: MovieInput) -> Movie {
        let mut catalog = self.inner.write().await;
        let id = catalog.next_movie_id;
        catalog.next_movie_id += 1;

        let movie = Movie {
            id,
            title: input.title,
            release_date: input.release_date,
        };
        catalog.movies.insert(id, movie.clone());

        tracing::debug!(target: "ca.catalog", movie_id = id, "Movie inserted");
        movie
    }

    /// Replace a movie's fields. `None` if the id is unknown.
    #[instrument(skip(self, input), name = "ca.catalog.update_movie")]
    pub async fn update_movie(&self, id: u64, input: MovieInput) -> Option<Movie> {
        let mut catalog = self.inner.write().await;
        let movie = catalog.movies.get_mut(&id)?;

        movie.title = input.title;
        movie.release_date = input.release_date;

        Some(movie.clone())
    }

    /// Remove a movie. Returns whether it existed.
    #[instrument(skip(self), name = "ca.catalog.delete_movie")]
    pub async fn delete_movie(&self, id: u64) -> bool {
        self.inner.write().await.movies.remove(&id).is_some()
    }

    // ------------------------------------------------------------------------
    // Actors
    // ------------------------------------------------------------------------

    pub async fn list_actors(&self) -> Vec<Actor> {
        self.inner.read().await.actors.values().cloned().collect()
    }

    pub async fn get_actor(&self, id: u64) -> Option<Actor> {
        self.inner.read().await.actors.get(&id).cloned()
    }

    #[instrument(skip_all, name = "ca.catalog.insert_actor")]
    pub async fn insert_actor(&self, input: ActorInput) -> Actor {
        let mut catalog = self.inner.write().await;
        let id = catalog.next_actor_id;
        catalog.next_actor_id += 1;

        let actor = Actor {
            id,
            name: input.name,
            age: input.age,
            gender: input.gender,
        };
        catalog.actors.insert(id, actor.clone());

        tracing::debug!(target: "ca.catalog", actor_id = id, "Actor inserted");
        actor
    }

    /// Replace an actor's fields. `None` if the id is unknown.
    #[instrument(skip(self, input), name = "ca.catalog.update_actor")]
    pub async fn update_actor(&self, id: u64, input: ActorInput) -> Option<Actor> {
        let mut catalog = self.inner.write().await;
        let actor = catalog.actors.get_mut(&id)?;

        actor.name = input.name;
        actor.age = input.age;
        actor.gender = input.gender;

        Some(actor.clone())
    }

    /// Remove an actor. Returns whether it existed.
    #[instrument(skip(self), name = "ca.catalog.delete_actor")]
    pub async fn delete_actor(&self, id: u64) -> bool {
        self.inner.write().await.actors.remove(&id).is_some()
    }
}
