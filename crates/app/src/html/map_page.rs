pub(crate) const MAP_INDEX_HTML: &str = r#"<!doctype html>
<html lang="en">

<head>
  <meta charset="utf-8" />
  <meta name="viewport" content="width=device-width, initial-scale=1.0" />
  <title>Memory Map</title>

  <!-- Leaflet 1.9.4 -->
  <link rel="stylesheet" href="https://cdnjs.cloudflare.com/ajax/libs/leaflet/1.9.4/leaflet.css" crossorigin="anonymous"
    referrerpolicy="no-referrer" />
  <script src="https://cdnjs.cloudflare.com/ajax/libs/leaflet/1.9.4/leaflet.js" crossorigin="anonymous"
    referrerpolicy="no-referrer"></script>

  <style>
    html,
    body {
      height: 100%;
      margin: 0;
    }

    #map {
      height: 100%;
    }

    #status {
      position: absolute;
      top: 12px;
      left: 50%;
      transform: translateX(-50%);
      z-index: 1000;
      padding: 6px 14px;
      border-radius: 6px;
      background: rgba(15, 23, 42, 0.85);
      color: #f8fafc;
      font: 14px/1.4 system-ui, sans-serif;
    }

    .cluster-bubble {
      display: flex;
      align-items: center;
      justify-content: center;
      width: 34px;
      height: 34px;
      border-radius: 50%;
      background: rgba(56, 189, 248, 0.9);
      border: 2px solid rgba(15, 23, 42, 0.85);
      color: #0f172a;
      font: bold 13px/1 system-ui, sans-serif;
    }
  </style>
</head>

<body>
  <div id="map"></div>
  <div id="status" hidden></div>

  <script>
    let map = null;
    let clusterLayer = null;

    function showStatus(message) {
      const status = document.getElementById('status');
      status.textContent = message;
      status.hidden = false;
    }

    function hideStatus() {
      document.getElementById('status').hidden = true;
    }

    function popupBody(photo) {
      return `<b>${photo.filename}</b><br>${photo.latitude}, ${photo.longitude}`;
    }

    // The map surface and tile layer always come up before any marker
    // request is issued.
    async function initMap() {
      const response = await fetch('/mapconfig');
      if (!response.ok) throw new Error(`bootstrap failed (${response.status})`);
      const config = await response.json();

      map = L.map('map').setView(config.center, config.zoom);
      L.tileLayer(config.tile_url, { attribution: config.attribution }).addTo(map);
      clusterLayer = L.layerGroup().addTo(map);
      map.on('zoomend', () => { refreshMarkers(); });
      return config;
    }

    async function refreshMarkers() {
      try {
        const response = await fetch(`/markers?zoom=${map.getZoom()}`);
        if (!response.ok) throw new Error(`markers request failed (${response.status})`);
        const payload = await response.json();

        clusterLayer.clearLayers();
        for (const cluster of payload.clusters) {
          if (cluster.count > 1) {
            const icon = L.divIcon({
              className: '',
              html: `<div class="cluster-bubble">${cluster.count}</div>`,
              iconSize: [34, 34]
            });
            L.marker([cluster.latitude, cluster.longitude], { icon })
              .bindPopup(`${cluster.count} photos`)
              .addTo(clusterLayer);
          } else {
            for (const photo of cluster.photos) {
              L.marker([photo.latitude, photo.longitude])
                .bindPopup(popupBody(photo))
                .addTo(clusterLayer);
            }
          }
        }
        hideStatus();
      } catch (err) {
        showStatus('Markers unavailable');
      }
    }

    async function loadLatestMarker(config) {
      try {
        const response = await fetch(config.marker_source);
        if (response.status === 204) {
          showStatus('No geotagged photos yet');
          return;
        }
        if (!response.ok) throw new Error(`marker request failed (${response.status})`);
        const record = await response.json();

        L.marker([record.latitude, record.longitude]).addTo(map)
          .bindPopup(popupBody(record))
          .openPopup();
      } catch (err) {
        showStatus('Marker unavailable');
      }
    }

    initMap()
      .then(async (config) => {
        await refreshMarkers();
        await loadLatestMarker(config);
      })
      .catch(() => { showStatus('Map unavailable'); });
  </script>
</body>

</html>
"#;
